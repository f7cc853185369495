//! Client error types.

use quietwire_crypto::CryptoError;

/// Errors returned by [`crate::Client::handle`].
///
/// An uninitialized identity is fatal to all operations until re-initialized;
/// everything else is scoped to one peer or one message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// No local identity exists yet. Fatal until `Initialize` succeeds.
    #[error("local identity is not initialized")]
    NotInitialized,

    /// No session id has been assigned (no `welcome` received).
    #[error("not registered with the relay")]
    NotRegistered,

    /// No key material is stored for the peer.
    #[error("no peer session for {peer_id}")]
    NoPeerSession {
        /// The peer whose session is missing.
        peer_id: String,
    },

    /// The group is not known to this client.
    #[error("unknown group {group_id}")]
    UnknownGroup {
        /// The unknown group id.
        group_id: String,
    },

    /// A cryptographic operation failed. Peer-scoped, never fatal.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
