//! Server error types.
//!
//! [`ServerError`] covers process-level failures (bind, transport, entropy).
//! [`RelayError`] covers per-frame routing failures; its `Display` output is
//! what goes into client-facing `error` frames, so it names only facts the
//! sender already knows (the ids it supplied), never internal detail.

use std::fmt;

use quietwire_proto::FrameViolation;

/// Process-level server failures.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error
    Config(String),

    /// Transport/network error
    Transport(String),

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Per-frame routing failures, reported back to the offending client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The target session id was never registered.
    #[error("no client with id {peer_id}")]
    PeerNotFound {
        /// The requested session id.
        peer_id: String,
    },

    /// The target was registered but its connection is gone.
    #[error("client {peer_id} is unavailable")]
    RecipientUnavailable {
        /// The unreachable session id.
        peer_id: String,
    },

    /// The group id is not known to the relay.
    #[error("unknown group {group_id}")]
    UnknownGroup {
        /// The requested group id.
        group_id: String,
    },

    /// A group id is already taken. Membership is fixed at creation, so a
    /// second creation can never be a legitimate update.
    #[error("group {group_id} already exists")]
    GroupAlreadyExists {
        /// The conflicting group id.
        group_id: String,
    },

    /// The sender or a payload recipient is not a member of the group.
    #[error("not a member of group {group_id}")]
    NotAMember {
        /// The group being addressed.
        group_id: String,
    },

    /// The frame failed structural validation.
    #[error(transparent)]
    InvalidFrame(#[from] FrameViolation),

    /// The connection exceeded its frame rate budget.
    #[error("rate limit exceeded")]
    RateLimited,
}
