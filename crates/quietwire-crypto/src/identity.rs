//! Local identity: one ECDH key pair and one ECDSA key pair.
//!
//! The private halves live exclusively in this process. They are generated
//! per session, never serialized, and dropped on teardown - there is no
//! persistence path by construction. Only the exported [`KeyBundle`]
//! (public SPKI material, base64) ever crosses the wire.

use base64::{Engine, engine::general_purpose::STANDARD};
use p256::{
    SecretKey,
    ecdsa::{Signature, SigningKey, signature::Signer},
    elliptic_curve::rand_core::CryptoRngCore,
    pkcs8::EncodePublicKey,
};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Exported public key bundle, the JSON payload of `publickey` frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBundle {
    /// Base64 SPKI DER of the P-256 ECDH public key.
    pub encryption: String,
    /// Base64 SPKI DER of the P-256 ECDSA public key.
    pub signing: String,
}

impl KeyBundle {
    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String, CryptoError> {
        serde_json::to_string(self).map_err(|_| CryptoError::InvalidKeyFormat)
    }
}

/// Local cryptographic identity.
pub struct Identity {
    encryption: SecretKey,
    signing: SigningKey,
}

impl Identity {
    /// Generate a fresh identity from the supplied randomness source.
    pub fn generate(rng: &mut impl CryptoRngCore) -> Self {
        Self { encryption: SecretKey::random(rng), signing: SigningKey::random(rng) }
    }

    /// Export the public bundle for transmission.
    pub fn public_bundle(&self) -> Result<KeyBundle, CryptoError> {
        let encryption = self
            .encryption
            .public_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        let signing = self
            .signing
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(KeyBundle {
            encryption: STANDARD.encode(encryption.as_bytes()),
            signing: STANDARD.encode(signing.as_bytes()),
        })
    }

    /// Fingerprint of our own encryption key, as peers will see it.
    pub fn fingerprint(&self) -> Result<String, CryptoError> {
        let der = self
            .encryption
            .public_key()
            .to_public_key_der()
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(crate::fingerprint::fingerprint(der.as_bytes()))
    }

    /// Sign arbitrary bytes with the ECDSA key; raw 64-byte `r || s` output.
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        let signature: Signature = self.signing.sign(msg);
        signature.to_bytes().to_vec()
    }

    /// ECDH private half, used only for session derivation.
    pub(crate) fn ecdh_secret(&self) -> &SecretKey {
        &self.encryption
    }
}

// Key material must never leak through logs.
impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity").finish_non_exhaustive()
    }
}
