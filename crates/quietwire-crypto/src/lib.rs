//! Quietwire Cryptographic Primitives
//!
//! This crate provides the cryptographic building blocks for the Quietwire
//! protocol: identity key pairs, per-peer session derivation, the
//! authenticated message codec, and human-comparable fingerprints.
//!
//! # Design
//!
//! All functions in this crate are pure - they have no side effects and
//! produce deterministic outputs given the same inputs. Random bytes required
//! for key generation and encryption must be provided by the caller,
//! enabling:
//!
//! - Deterministic testing with seeded RNG
//! - Sans-IO architecture compatibility
//! - No coupling to application-level abstractions
//!
//! # Security Properties
//!
//! - End-to-End Confidentiality: per-peer AES-256-GCM keys derived via ECDH;
//!   the relay never sees key material
//! - Sender Authentication: ECDSA P-256 signature over every ciphertext,
//!   verified before decryption
//! - Nonce Discipline: every encryption call consumes a caller-supplied fresh
//!   96-bit IV; IV reuse under one key is a confidentiality violation
//!
//! Known limitation (by protocol design, see DESIGN.md): one derived key per
//! peer is reused for the whole session - there is no ratcheting and no
//! per-message forward secrecy.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod session;

pub use codec::{IV_SIZE, SealedEnvelope, decrypt_unsigned, encrypt_and_sign, verify_and_decrypt};
pub use error::CryptoError;
pub use fingerprint::{FINGERPRINT_SYMBOLS, combine, fingerprint};
pub use identity::{Identity, KeyBundle};
pub use session::PeerSession;
