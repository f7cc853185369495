//! Authenticated message codec.
//!
//! Outgoing: AES-256-GCM under the session key with a caller-supplied fresh
//! 96-bit IV, IV prepended to the AEAD output, base64-encoded; the ECDSA
//! signature covers the base64 ciphertext *string*, not the plaintext.
//!
//! Incoming: the signature is verified **before** any decryption is
//! attempted. That ordering is the only defense against relay-level
//! tampering or sender spoofing - an envelope whose signature fails must
//! never reach the AEAD.

use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce, aead::Aead};
use base64::{Engine, engine::general_purpose::STANDARD};
use p256::ecdsa::{Signature, signature::Verifier};

use crate::{error::CryptoError, identity::Identity, session::PeerSession};

/// AES-GCM IV size in bytes (96 bits).
pub const IV_SIZE: usize = 12;

/// GCM authentication tag size in bytes (128 bits).
const TAG_SIZE: usize = 16;

/// An encrypted, signed envelope ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedEnvelope {
    /// Base64 of `IV || ciphertext || tag`.
    pub ciphertext: String,
    /// Base64 of the raw 64-byte ECDSA signature over `ciphertext`.
    pub signature: String,
}

/// Encrypt `plaintext` for the session's peer and sign the result.
///
/// `iv` must be freshly drawn from a cryptographic RNG for every call.
/// Reusing an IV under the same session key is a confidentiality violation.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the AEAD seal fails.
pub fn encrypt_and_sign(
    identity: &Identity,
    session: &PeerSession,
    plaintext: &[u8],
    iv: [u8; IV_SIZE],
) -> Result<SealedEnvelope, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(session.shared_key()));
    let sealed =
        cipher.encrypt(Nonce::from_slice(&iv), plaintext).map_err(|_| CryptoError::Encryption)?;

    let mut out = Vec::with_capacity(IV_SIZE + sealed.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&sealed);
    let ciphertext = STANDARD.encode(&out);

    let signature = STANDARD.encode(identity.sign(ciphertext.as_bytes()));

    Ok(SealedEnvelope { ciphertext, signature })
}

/// Verify the envelope's signature, then decrypt it.
///
/// # Errors
///
/// - [`CryptoError::NoPeerKey`] if the session has no signing key
/// - [`CryptoError::SignatureInvalid`] on any signature mismatch; decryption
///   is not attempted in that case
/// - [`CryptoError::Decryption`] on tag mismatch or a malformed envelope
pub fn verify_and_decrypt(
    session: &PeerSession,
    ciphertext: &str,
    signature: &str,
) -> Result<Vec<u8>, CryptoError> {
    let verifying_key = session.signing_key().ok_or(CryptoError::NoPeerKey)?;

    let sig_bytes = STANDARD.decode(signature).map_err(|_| CryptoError::SignatureInvalid)?;
    let sig = Signature::from_slice(&sig_bytes).map_err(|_| CryptoError::SignatureInvalid)?;
    verifying_key
        .verify(ciphertext.as_bytes(), &sig)
        .map_err(|_| CryptoError::SignatureInvalid)?;

    decrypt_unsigned(session, ciphertext)
}

/// Legacy fallback: decrypt without signature verification.
///
/// Carries no authenticity guarantee and must never be the default path;
/// it exists only for envelopes produced by legacy unsigned senders.
///
/// # Errors
///
/// Returns [`CryptoError::Decryption`] on tag mismatch or malformed input.
pub fn decrypt_unsigned(session: &PeerSession, ciphertext: &str) -> Result<Vec<u8>, CryptoError> {
    let raw = STANDARD.decode(ciphertext).map_err(|_| CryptoError::Decryption)?;
    if raw.len() < IV_SIZE + TAG_SIZE {
        return Err(CryptoError::Decryption);
    }
    let (iv, sealed) = raw.split_at(IV_SIZE);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(session.shared_key()));
    cipher.decrypt(Nonce::from_slice(iv), sealed).map_err(|_| CryptoError::Decryption)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::OsRng};
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::identity::Identity;

    struct Pair {
        alice: Identity,
        bob: Identity,
        alice_to_bob: PeerSession,
        bob_from_alice: PeerSession,
    }

    fn pair() -> Pair {
        let alice = Identity::generate(&mut OsRng);
        let bob = Identity::generate(&mut OsRng);
        let alice_to_bob = PeerSession::derive(
            &alice,
            "bob",
            &bob.public_bundle().unwrap().to_json().unwrap(),
        )
        .unwrap();
        let bob_from_alice = PeerSession::derive(
            &bob,
            "alice",
            &alice.public_bundle().unwrap().to_json().unwrap(),
        )
        .unwrap();
        Pair { alice, bob, alice_to_bob, bob_from_alice }
    }

    fn fresh_iv(rng: &mut impl Rng) -> [u8; IV_SIZE] {
        let mut iv = [0u8; IV_SIZE];
        rng.fill(&mut iv);
        iv
    }

    #[test]
    fn round_trip() {
        let p = pair();
        let mut rng = ChaCha20Rng::seed_from_u64(7);

        let envelope =
            encrypt_and_sign(&p.alice, &p.alice_to_bob, b"hi", fresh_iv(&mut rng)).unwrap();
        let plaintext =
            verify_and_decrypt(&p.bob_from_alice, &envelope.ciphertext, &envelope.signature)
                .unwrap();

        assert_eq!(plaintext, b"hi");
    }

    #[test]
    fn round_trip_empty_and_large() {
        let p = pair();
        let mut rng = ChaCha20Rng::seed_from_u64(8);

        for plaintext in [Vec::new(), vec![0xAB; 64 * 1024]] {
            let envelope =
                encrypt_and_sign(&p.alice, &p.alice_to_bob, &plaintext, fresh_iv(&mut rng))
                    .unwrap();
            let out =
                verify_and_decrypt(&p.bob_from_alice, &envelope.ciphertext, &envelope.signature)
                    .unwrap();
            assert_eq!(out, plaintext);
        }
    }

    #[test]
    fn tampered_ciphertext_fails_signature_not_decryption() {
        let p = pair();
        let mut rng = ChaCha20Rng::seed_from_u64(9);

        let envelope =
            encrypt_and_sign(&p.alice, &p.alice_to_bob, b"payload", fresh_iv(&mut rng)).unwrap();

        // Flip one base64 symbol; verification must fail before the AEAD runs.
        let mut bytes = envelope.ciphertext.into_bytes();
        bytes[4] = if bytes[4] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        let err =
            verify_and_decrypt(&p.bob_from_alice, &tampered, &envelope.signature).unwrap_err();
        assert_eq!(err, CryptoError::SignatureInvalid);
    }

    #[test]
    fn tampered_signature_fails() {
        let p = pair();
        let mut rng = ChaCha20Rng::seed_from_u64(10);

        let envelope =
            encrypt_and_sign(&p.alice, &p.alice_to_bob, b"payload", fresh_iv(&mut rng)).unwrap();

        let mut sig = envelope.signature.into_bytes();
        sig[0] = if sig[0] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(sig).unwrap();

        let err =
            verify_and_decrypt(&p.bob_from_alice, &envelope.ciphertext, &tampered).unwrap_err();
        assert_eq!(err, CryptoError::SignatureInvalid);
    }

    #[test]
    fn signature_from_wrong_sender_fails() {
        let p = pair();
        let mallory = Identity::generate(&mut OsRng);
        let mut rng = ChaCha20Rng::seed_from_u64(11);

        // Mallory encrypts under Alice's session key (hypothetical relay
        // compromise) but cannot produce Alice's signature.
        let envelope =
            encrypt_and_sign(&mallory, &p.alice_to_bob, b"spoof", fresh_iv(&mut rng)).unwrap();

        let err = verify_and_decrypt(&p.bob_from_alice, &envelope.ciphertext, &envelope.signature)
            .unwrap_err();
        assert_eq!(err, CryptoError::SignatureInvalid);
    }

    #[test]
    fn unsigned_path_decrypts_without_signature() {
        let p = pair();
        let mut rng = ChaCha20Rng::seed_from_u64(12);

        let envelope =
            encrypt_and_sign(&p.alice, &p.alice_to_bob, b"legacy", fresh_iv(&mut rng)).unwrap();
        let plaintext = decrypt_unsigned(&p.bob_from_alice, &envelope.ciphertext).unwrap();
        assert_eq!(plaintext, b"legacy");
    }

    #[test]
    fn truncated_envelope_is_decryption_error() {
        let p = pair();
        let short = STANDARD.encode([0u8; IV_SIZE + TAG_SIZE - 1]);
        let err = decrypt_unsigned(&p.bob_from_alice, &short).unwrap_err();
        assert_eq!(err, CryptoError::Decryption);
    }

    #[test]
    fn wrong_key_is_decryption_error_on_unsigned_path() {
        let p = pair();
        let carol = Identity::generate(&mut OsRng);
        let alice_to_carol = PeerSession::derive(
            &p.alice,
            "carol",
            &carol.public_bundle().unwrap().to_json().unwrap(),
        )
        .unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(13);

        let envelope =
            encrypt_and_sign(&p.alice, &alice_to_carol, b"for carol", fresh_iv(&mut rng)).unwrap();

        // Bob's session key cannot open Carol's ciphertext.
        let err = decrypt_unsigned(&p.bob_from_alice, &envelope.ciphertext).unwrap_err();
        assert_eq!(err, CryptoError::Decryption);
    }

    #[test]
    fn verify_without_signing_key_is_no_peer_key() {
        let alice = Identity::generate(&mut OsRng);
        let bob = Identity::generate(&mut OsRng);
        let legacy = bob.public_bundle().unwrap().encryption;
        let session = PeerSession::derive(&alice, "bob", &legacy).unwrap();

        let err = verify_and_decrypt(&session, "AAAA", "BBBB").unwrap_err();
        assert_eq!(err, CryptoError::NoPeerKey);
    }

    #[test]
    fn consecutive_encryptions_never_repeat_an_iv() {
        // 10k consecutive encryptions to the same peer must never repeat an
        // IV. Asserted on the envelope itself: the first 12 bytes of the
        // decoded ciphertext are the IV actually sent.
        let p = pair();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            let envelope =
                encrypt_and_sign(&p.alice, &p.alice_to_bob, b"tick", fresh_iv(&mut OsRng))
                    .unwrap();
            let raw = STANDARD.decode(&envelope.ciphertext).unwrap();
            let mut iv = [0u8; IV_SIZE];
            iv.copy_from_slice(&raw[..IV_SIZE]);
            assert!(seen.insert(iv), "duplicate IV across consecutive encryptions");
        }
    }
}
