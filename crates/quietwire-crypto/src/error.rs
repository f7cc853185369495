//! Crypto error types.
//!
//! Every variant is peer-scoped: a failure affects one peer session or one
//! envelope and is never fatal to the local identity.

/// Errors from cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Peer bundle is neither a JSON key bundle nor a legacy base64 key.
    #[error("peer bundle is not valid key material")]
    InvalidKeyFormat,

    /// Key material decoded but is cryptographically unusable (wrong curve,
    /// point not on curve, malformed SPKI body).
    #[error("peer key is unusable: {0}")]
    KeyDerivation(String),

    /// No session exists for the peer, or the session lacks a signing key.
    #[error("no key material stored for peer")]
    NoPeerKey,

    /// ECDSA verification failed. The envelope must not be decrypted.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// AEAD open failed (tag mismatch) or the envelope is malformed.
    #[error("decryption failed")]
    Decryption,

    /// AEAD seal failed.
    #[error("encryption failed")]
    Encryption,
}
