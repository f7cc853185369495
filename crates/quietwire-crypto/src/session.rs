//! Per-peer session state.
//!
//! A [`PeerSession`] is created on first successful receipt of a peer's key
//! bundle. The 32-byte AES key is derived immediately via ECDH + HKDF-SHA256
//! and cached; it is computable only from the local private key plus the
//! peer's public key and is never itself transmitted. One derived key is
//! reused for every message exchanged with that peer.
//!
//! Failure leaves no session behind: a bundle that cannot be interpreted
//! ([`CryptoError::InvalidKeyFormat`]) or decodes to unusable key material
//! ([`CryptoError::KeyDerivation`]) produces an error, not a half-built
//! session.

use base64::{Engine, engine::general_purpose::STANDARD};
use hkdf::Hkdf;
use p256::{PublicKey, ecdh, ecdsa::VerifyingKey, pkcs8::DecodePublicKey};
use sha2::Sha256;

use crate::{
    error::CryptoError,
    fingerprint,
    identity::{Identity, KeyBundle},
};

/// HKDF domain separation for the per-peer AES-256-GCM key.
const SHARED_KEY_INFO: &[u8] = b"quietwire shared key v1";

/// Established pairwise session with one peer.
pub struct PeerSession {
    /// Peer session id.
    pub peer_id: String,
    encryption_key: PublicKey,
    signing_key: Option<VerifyingKey>,
    shared_key: [u8; 32],
    fingerprint: String,
}

impl PeerSession {
    /// Derive a session from a peer's bundle string.
    ///
    /// The bundle is parsed as JSON `{encryption, signing}`; if that fails,
    /// the raw string is treated as a single legacy base64 encryption key
    /// (backward-compatibility path, no signing key).
    pub fn derive(local: &Identity, peer_id: &str, bundle: &str) -> Result<Self, CryptoError> {
        let (encryption_der, signing_der) = match serde_json::from_str::<KeyBundle>(bundle) {
            Ok(parsed) => {
                let enc = STANDARD.decode(&parsed.encryption).map_err(|_| CryptoError::InvalidKeyFormat)?;
                let sig = STANDARD.decode(&parsed.signing).map_err(|_| CryptoError::InvalidKeyFormat)?;
                (enc, Some(sig))
            },
            // Legacy path: the whole string is one base64 encryption key.
            Err(_) => {
                let enc = STANDARD.decode(bundle.trim()).map_err(|_| CryptoError::InvalidKeyFormat)?;
                (enc, None)
            },
        };

        let encryption_key = PublicKey::from_public_key_der(&encryption_der)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

        let signing_key = match signing_der {
            Some(der) => Some(
                VerifyingKey::from_public_key_der(&der)
                    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?,
            ),
            None => None,
        };

        let shared_key = derive_shared_key(local, &encryption_key)?;
        let fingerprint = fingerprint::fingerprint(&encryption_der);

        Ok(Self { peer_id: peer_id.to_string(), encryption_key, signing_key, shared_key, fingerprint })
    }

    /// The peer's ECDSA verification key, absent on the legacy path.
    pub fn signing_key(&self) -> Option<&VerifyingKey> {
        self.signing_key.as_ref()
    }

    /// The peer's ECDH public key.
    pub fn encryption_key(&self) -> &PublicKey {
        &self.encryption_key
    }

    /// Human-comparable fingerprint of the peer's encryption key.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Derived AES-256-GCM key. Crate-private: only the codec touches it.
    pub(crate) fn shared_key(&self) -> &[u8; 32] {
        &self.shared_key
    }
}

impl std::fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSession")
            .field("peer_id", &self.peer_id)
            .field("signed", &self.signing_key.is_some())
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// ECDH shared point -> HKDF-SHA256 -> 32-byte AEAD key.
fn derive_shared_key(local: &Identity, peer: &PublicKey) -> Result<[u8; 32], CryptoError> {
    let shared = ecdh::diffie_hellman(local.ecdh_secret().to_nonzero_scalar(), peer.as_affine());
    let hk = shared.extract::<Sha256>(None);
    let mut key = [0u8; 32];
    hk.expand(SHARED_KEY_INFO, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}
