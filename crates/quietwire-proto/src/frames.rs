//! Frame definitions for both wire directions.
//!
//! Field names follow the wire protocol exactly (`sessionID`, `fromID`, ...):
//! serde renames keep the Rust side idiomatic while the JSON stays compatible
//! with browser clients.

use serde::{Deserialize, Serialize};

/// One pairwise ciphertext inside a group message.
///
/// Each group recipient has a distinct ECDH-derived key, so the sender
/// produces one independently encrypted payload per member. There is no
/// shared group key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPayload {
    /// Recipient session id.
    #[serde(rename = "toID")]
    pub to_id: String,
    /// Base64 of IV-prefixed AEAD output.
    pub encrypted: String,
    /// Base64 ECDSA signature over the `encrypted` string.
    pub signature: String,
}

/// Frames sent by a client to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum ClientFrame {
    /// Publish this client's public key bundle without targeting a peer.
    PublicKey {
        /// Exported public key bundle (JSON string or legacy base64 key).
        #[serde(rename = "publicKey")]
        public_key: String,
    },

    /// Request a key exchange with a specific peer.
    KeyExchange {
        /// Target session id.
        #[serde(rename = "toID")]
        to_id: String,
        /// Exported public key bundle of the requester.
        #[serde(rename = "publicKey")]
        public_key: String,
    },

    /// One-to-one encrypted message.
    ChatMessage {
        /// Target session id.
        #[serde(rename = "toID")]
        to_id: String,
        /// Base64 of IV-prefixed AEAD output.
        encrypted: String,
        /// Base64 ECDSA signature. Absent only on the legacy unsigned path.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        signature: Option<String>,
    },

    /// Create a group with a fixed member list.
    ///
    /// `creatorID` is accepted on the wire for shape compatibility but the
    /// relay always stamps the authenticated session id instead.
    CreateGroup {
        /// Caller-chosen group id.
        #[serde(rename = "groupID")]
        group_id: String,
        /// Human-readable group name.
        #[serde(rename = "groupName")]
        group_name: String,
        /// Full membership, fixed at creation time.
        #[serde(rename = "memberIDs")]
        member_ids: Vec<String>,
        /// Self-reported creator, ignored by the relay.
        #[serde(rename = "creatorID", skip_serializing_if = "Option::is_none", default)]
        creator_id: Option<String>,
    },

    /// Group message: one pairwise ciphertext per recipient.
    GroupMessage {
        /// Target group id.
        #[serde(rename = "groupID")]
        group_id: String,
        /// One payload per recipient (excluding the sender).
        #[serde(rename = "encryptedPayloads")]
        encrypted_payloads: Vec<GroupPayload>,
    },
}

/// Frames sent by the relay to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum ServerFrame {
    /// First frame on every connection: the assigned session id.
    Welcome {
        /// Ephemeral session id for this connection.
        #[serde(rename = "sessionID")]
        session_id: String,
    },

    /// A peer's public key bundle, relayed during key exchange.
    PublicKey {
        /// Authenticated sender session id.
        #[serde(rename = "fromID")]
        from_id: String,
        /// The peer's exported bundle.
        #[serde(rename = "publicKey")]
        public_key: String,
    },

    /// Relayed one-to-one message. `fromID` is stamped by the relay from the
    /// authenticated transport identity, never from the sender's payload.
    ChatMessage {
        /// Authenticated sender session id.
        #[serde(rename = "fromID")]
        from_id: String,
        /// Opaque ciphertext, forwarded unchanged.
        encrypted: String,
        /// Opaque signature, forwarded unchanged.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        signature: Option<String>,
    },

    /// Group descriptor broadcast to every online member at creation.
    GroupCreated {
        /// Group id.
        #[serde(rename = "groupID")]
        group_id: String,
        /// Group name.
        #[serde(rename = "groupName")]
        group_name: String,
        /// Full fixed membership.
        #[serde(rename = "memberIDs")]
        member_ids: Vec<String>,
        /// Authenticated creator session id.
        #[serde(rename = "creatorID")]
        creator_id: String,
    },

    /// Relayed group message: the single payload addressed to this recipient.
    GroupMessage {
        /// Group id.
        #[serde(rename = "groupID")]
        group_id: String,
        /// Authenticated sender session id.
        #[serde(rename = "fromID")]
        from_id: String,
        /// Ciphertext encrypted under this recipient's pairwise key.
        encrypted: String,
        /// Signature over the ciphertext.
        signature: String,
    },

    /// Sanitized error report. Never echoes internal exception detail.
    Error {
        /// Human-readable, sanitized description.
        message: String,
    },
}

/// Decode a client frame from raw JSON bytes.
///
/// # Errors
///
/// Returns the underlying serde error for malformed JSON or an unknown
/// `type` tag; callers drop such frames without state change.
pub fn decode_client_frame(bytes: &[u8]) -> Result<ClientFrame, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Encode any serializable frame to its JSON wire form.
///
/// # Errors
///
/// Returns a serde error only if a value cannot be represented as JSON,
/// which cannot happen for the frame types in this crate.
pub fn encode_frame<T: Serialize>(frame: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(frame)
}
