//! Frame validation limits.
//!
//! The relay enforces these before acting on any decoded frame. Oversized or
//! malformed fields are rejected at the edge so inner components only ever
//! see bounded, well-formed input.

use crate::frames::ClientFrame;

/// A P-256 SPKI key bundle is ~250 bytes of JSON; allow generous slack.
const MAX_KEY_BUNDLE_LEN: usize = 1024;

/// Raw 64-byte ECDSA signature is 88 base64 characters.
const MAX_SIGNATURE_LEN: usize = 128;

/// Bounds applied to every inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLimits {
    /// Maximum base64 ciphertext length per message.
    pub max_ciphertext_len: usize,
    /// Maximum members in one group.
    pub max_group_members: usize,
    /// Maximum length of a group display name.
    pub max_group_name_len: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self { max_ciphertext_len: 64 * 1024, max_group_members: 64, max_group_name_len: 256 }
    }
}

/// Why a frame was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameViolation {
    /// A session or group id is empty, too long, or has forbidden characters.
    #[error("invalid identifier")]
    InvalidIdentifier,

    /// A ciphertext exceeds the configured bound.
    #[error("payload too large")]
    PayloadTooLarge,

    /// A key bundle or signature field exceeds its fixed bound.
    #[error("oversized key material")]
    OversizedKeyMaterial,

    /// Group membership is empty or exceeds the member cap.
    #[error("invalid group membership")]
    InvalidMembership,

    /// The group name exceeds its bound.
    #[error("group name too long")]
    GroupNameTooLong,
}

/// Identifier shape shared by session ids and group ids: 1..=64 characters,
/// alphanumeric plus `-` and `_`.
pub fn valid_peer_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl FrameLimits {
    /// Validate a decoded frame against these limits.
    ///
    /// # Errors
    ///
    /// Returns the first [`FrameViolation`] found.
    pub fn check(&self, frame: &ClientFrame) -> Result<(), FrameViolation> {
        match frame {
            ClientFrame::PublicKey { public_key } => self.check_bundle(public_key),
            ClientFrame::KeyExchange { to_id, public_key } => {
                check_id(to_id)?;
                self.check_bundle(public_key)
            },
            ClientFrame::ChatMessage { to_id, encrypted, signature } => {
                check_id(to_id)?;
                self.check_envelope(encrypted, signature.as_deref())
            },
            ClientFrame::CreateGroup { group_id, group_name, member_ids, creator_id } => {
                check_id(group_id)?;
                if group_name.len() > self.max_group_name_len {
                    return Err(FrameViolation::GroupNameTooLong);
                }
                if member_ids.is_empty() || member_ids.len() > self.max_group_members {
                    return Err(FrameViolation::InvalidMembership);
                }
                for member in member_ids {
                    check_id(member)?;
                }
                if let Some(creator) = creator_id {
                    check_id(creator)?;
                }
                Ok(())
            },
            ClientFrame::GroupMessage { group_id, encrypted_payloads } => {
                check_id(group_id)?;
                if encrypted_payloads.is_empty()
                    || encrypted_payloads.len() > self.max_group_members
                {
                    return Err(FrameViolation::InvalidMembership);
                }
                for payload in encrypted_payloads {
                    check_id(&payload.to_id)?;
                    self.check_envelope(&payload.encrypted, Some(&payload.signature))?;
                }
                Ok(())
            },
        }
    }

    fn check_bundle(&self, bundle: &str) -> Result<(), FrameViolation> {
        if bundle.is_empty() || bundle.len() > MAX_KEY_BUNDLE_LEN {
            return Err(FrameViolation::OversizedKeyMaterial);
        }
        Ok(())
    }

    fn check_envelope(
        &self,
        encrypted: &str,
        signature: Option<&str>,
    ) -> Result<(), FrameViolation> {
        if encrypted.is_empty() || encrypted.len() > self.max_ciphertext_len {
            return Err(FrameViolation::PayloadTooLarge);
        }
        if let Some(sig) = signature {
            if sig.len() > MAX_SIGNATURE_LEN {
                return Err(FrameViolation::OversizedKeyMaterial);
            }
        }
        Ok(())
    }
}

fn check_id(id: &str) -> Result<(), FrameViolation> {
    if valid_peer_id(id) { Ok(()) } else { Err(FrameViolation::InvalidIdentifier) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::GroupPayload;

    #[test]
    fn peer_id_shape() {
        assert!(valid_peer_id("abc-123_XYZ"));
        assert!(valid_peer_id("a"));
        assert!(!valid_peer_id(""));
        assert!(!valid_peer_id("has space"));
        assert!(!valid_peer_id("dots.not.ok"));
        assert!(!valid_peer_id(&"x".repeat(65)));
        assert!(valid_peer_id(&"x".repeat(64)));
    }

    #[test]
    fn chat_message_within_limits_passes() {
        let limits = FrameLimits::default();
        let frame = ClientFrame::ChatMessage {
            to_id: "bob".to_string(),
            encrypted: "AAAA".to_string(),
            signature: Some("sig".to_string()),
        };
        assert_eq!(limits.check(&frame), Ok(()));
    }

    #[test]
    fn oversized_ciphertext_is_rejected() {
        let limits = FrameLimits { max_ciphertext_len: 8, ..FrameLimits::default() };
        let frame = ClientFrame::ChatMessage {
            to_id: "bob".to_string(),
            encrypted: "A".repeat(9),
            signature: None,
        };
        assert_eq!(limits.check(&frame), Err(FrameViolation::PayloadTooLarge));
    }

    #[test]
    fn empty_ciphertext_is_rejected() {
        let limits = FrameLimits::default();
        let frame = ClientFrame::ChatMessage {
            to_id: "bob".to_string(),
            encrypted: String::new(),
            signature: None,
        };
        assert_eq!(limits.check(&frame), Err(FrameViolation::PayloadTooLarge));
    }

    #[test]
    fn bad_recipient_id_is_rejected() {
        let limits = FrameLimits::default();
        let frame = ClientFrame::ChatMessage {
            to_id: "no/slashes".to_string(),
            encrypted: "AAAA".to_string(),
            signature: None,
        };
        assert_eq!(limits.check(&frame), Err(FrameViolation::InvalidIdentifier));
    }

    #[test]
    fn group_member_cap_is_enforced() {
        let limits = FrameLimits { max_group_members: 2, ..FrameLimits::default() };
        let frame = ClientFrame::CreateGroup {
            group_id: "g1".to_string(),
            group_name: "team".to_string(),
            member_ids: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            creator_id: None,
        };
        assert_eq!(limits.check(&frame), Err(FrameViolation::InvalidMembership));
    }

    #[test]
    fn empty_group_is_rejected() {
        let limits = FrameLimits::default();
        let frame = ClientFrame::CreateGroup {
            group_id: "g1".to_string(),
            group_name: "team".to_string(),
            member_ids: Vec::new(),
            creator_id: None,
        };
        assert_eq!(limits.check(&frame), Err(FrameViolation::InvalidMembership));
    }

    #[test]
    fn group_payloads_are_checked_individually() {
        let limits = FrameLimits::default();
        let frame = ClientFrame::GroupMessage {
            group_id: "g1".to_string(),
            encrypted_payloads: vec![
                GroupPayload {
                    to_id: "bob".to_string(),
                    encrypted: "AAAA".to_string(),
                    signature: "sig".to_string(),
                },
                GroupPayload {
                    to_id: "bad id!".to_string(),
                    encrypted: "AAAA".to_string(),
                    signature: "sig".to_string(),
                },
            ],
        };
        assert_eq!(limits.check(&frame), Err(FrameViolation::InvalidIdentifier));
    }

    #[test]
    fn oversized_bundle_is_rejected() {
        let limits = FrameLimits::default();
        let frame = ClientFrame::PublicKey { public_key: "A".repeat(2048) };
        assert_eq!(limits.check(&frame), Err(FrameViolation::OversizedKeyMaterial));
    }
}
