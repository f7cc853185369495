//! Events consumed and actions produced by the client state machine.

use std::time::Duration;

use quietwire_proto::{ClientFrame, ServerFrame};

/// Inputs to [`crate::Client::handle`].
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Generate the local identity (ECDH + ECDSA key pairs).
    ///
    /// Idempotent only in the sense that re-initializing replaces the
    /// identity; every operation before the first `Initialize` fails with
    /// [`crate::ClientError::NotInitialized`].
    Initialize,

    /// The transport established a connection to the relay.
    Connected,

    /// The transport lost the connection.
    ConnectionLost,

    /// A decoded frame arrived from the relay.
    FrameReceived(ServerFrame),

    /// User intent: exchange keys with a peer.
    RequestExchange {
        /// Target session id.
        peer_id: String,
    },

    /// User intent: send an encrypted one-to-one message.
    SendMessage {
        /// Target session id.
        peer_id: String,
        /// Message plaintext.
        plaintext: Vec<u8>,
    },

    /// User intent: create a group with a fixed member list.
    CreateGroup {
        /// Caller-chosen group id.
        group_id: String,
        /// Display name.
        name: String,
        /// Full membership, fixed at creation.
        member_ids: Vec<String>,
    },

    /// User intent: send a message to every group member.
    SendGroupMessage {
        /// Target group id.
        group_id: String,
        /// Message plaintext.
        plaintext: Vec<u8>,
    },
}

/// Outputs of [`crate::Client::handle`] for the embedder to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Send this frame to the relay.
    Send(ClientFrame),

    /// The relay assigned a session id.
    SessionEstablished {
        /// Our ephemeral session id.
        session_id: String,
    },

    /// A peer session is ready: keys stored, shared key derived.
    PeerEstablished {
        /// The peer's session id.
        peer_id: String,
        /// Fingerprint of the peer's encryption key, for out-of-band
        /// comparison.
        fingerprint: String,
    },

    /// Deliver a decrypted one-to-one message to the application.
    DeliverMessage {
        /// Authenticated sender id (relay-stamped).
        from_id: String,
        /// Decrypted plaintext.
        plaintext: Vec<u8>,
        /// False only on the legacy unsigned path; the application must
        /// surface unauthenticated messages differently.
        authenticated: bool,
    },

    /// Deliver a decrypted group message to the application.
    DeliverGroupMessage {
        /// Group id.
        group_id: String,
        /// Authenticated sender id.
        from_id: String,
        /// Decrypted plaintext.
        plaintext: Vec<u8>,
    },

    /// A group descriptor arrived (creation broadcast).
    GroupJoined {
        /// Group id.
        group_id: String,
        /// Display name.
        name: String,
        /// Full fixed membership.
        member_ids: Vec<String>,
        /// Creator session id.
        creator_id: String,
    },

    /// The relay reported an error (already sanitized server-side).
    RelayErrorReported {
        /// The relay's message.
        message: String,
    },

    /// Schedule a reconnect attempt after `delay`.
    Reconnect {
        /// Backoff delay before the next attempt.
        delay: Duration,
    },

    /// The retry cap is exhausted; surface a terminal failed-connection
    /// state instead of retrying forever.
    ConnectionFailed,
}
