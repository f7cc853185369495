//! Message relay: one-to-one routing and group fan-out.
//!
//! Ciphertexts and signatures pass through as opaque strings. The relay's
//! one authenticated contribution is the `fromID` stamp: it always carries
//! the session id of the connection a frame arrived on, never anything the
//! sender claimed about itself.

use quietwire_proto::{GroupPayload, ServerFrame};
use tracing::{debug, info};

use crate::{error::RelayError, groups::GroupTable, registry::ConnectionRegistry};

/// Routes encrypted messages between registered sessions.
#[derive(Debug, Clone)]
pub struct MessageRelay {
    registry: ConnectionRegistry,
    groups: GroupTable,
}

impl MessageRelay {
    /// Create a relay over the shared registry and group table.
    pub fn new(registry: ConnectionRegistry, groups: GroupTable) -> Self {
        Self { registry, groups }
    }

    /// Forward a one-to-one encrypted message.
    ///
    /// # Errors
    ///
    /// Fails `RecipientUnavailable` whether the recipient never registered
    /// or just disconnected; the sender gets exactly one error back either
    /// way. Distinguishing the two would leak which ids have ever existed.
    pub fn relay_chat(
        &self,
        from_id: &str,
        to_id: &str,
        encrypted: String,
        signature: Option<String>,
    ) -> Result<(), RelayError> {
        self.registry
            .send_to(to_id, ServerFrame::ChatMessage {
                from_id: from_id.to_string(),
                encrypted,
                signature,
            })
            .map_err(|err| match err {
                RelayError::PeerNotFound { peer_id } => {
                    RelayError::RecipientUnavailable { peer_id }
                },
                other => other,
            })
    }

    /// Create a group and broadcast its descriptor to every online member.
    ///
    /// The creator id comes from the authenticated connection. Offline
    /// members are skipped; they can learn the descriptor out of band.
    ///
    /// # Errors
    ///
    /// Fails if the group id is already taken.
    pub fn create_group(
        &self,
        creator_id: &str,
        group_id: &str,
        name: &str,
        member_ids: &[String],
    ) -> Result<(), RelayError> {
        let record = self.groups.create(group_id, name, member_ids, creator_id)?;
        info!(group_id, creator_id, members = record.member_ids.len(), "group created");

        let descriptor = ServerFrame::GroupCreated {
            group_id: group_id.to_string(),
            group_name: record.name.clone(),
            member_ids: record.member_ids.clone(),
            creator_id: creator_id.to_string(),
        };
        for member in &record.member_ids {
            if let Err(err) = self.registry.send_to(member, descriptor.clone()) {
                debug!(group_id, member, %err, "skipping offline member for descriptor");
            }
        }
        Ok(())
    }

    /// Fan out a group message: one pairwise ciphertext per recipient.
    ///
    /// Membership is validated in full before anything is delivered: the
    /// sender and every addressed recipient must belong to the group, or the
    /// whole frame is rejected with no partial delivery. Offline recipients
    /// are then skipped individually. Returns the number of deliveries.
    ///
    /// # Errors
    ///
    /// `UnknownGroup` or `NotAMember` on validation failure.
    pub fn relay_group(
        &self,
        from_id: &str,
        group_id: &str,
        payloads: &[GroupPayload],
    ) -> Result<usize, RelayError> {
        let record = self.groups.get(group_id)?;
        if !record.member_ids.iter().any(|m| m == from_id) {
            return Err(RelayError::NotAMember { group_id: group_id.to_string() });
        }
        for payload in payloads {
            if !record.member_ids.iter().any(|m| m == &payload.to_id) {
                return Err(RelayError::NotAMember { group_id: group_id.to_string() });
            }
        }

        let mut delivered = 0;
        for payload in payloads {
            let frame = ServerFrame::GroupMessage {
                group_id: group_id.to_string(),
                from_id: from_id.to_string(),
                encrypted: payload.encrypted.clone(),
                signature: payload.signature.clone(),
            };
            match self.registry.send_to(&payload.to_id, frame) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    debug!(group_id, to = payload.to_id.as_str(), %err, "skipping offline recipient");
                },
            }
        }
        Ok(delivered)
    }
}
