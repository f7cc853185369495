//! Key exchange coordination.
//!
//! The relay never interprets key material; it stores each session's latest
//! published bundle as an opaque string and forwards it on request. A single
//! exchange request moves bundles in both directions when both are known, so
//! the common case completes in one round trip.

use quietwire_proto::ServerFrame;
use tracing::debug;

use crate::{error::RelayError, registry::ConnectionRegistry};

/// Coordinates bundle publication and pairwise exchange.
#[derive(Debug, Clone)]
pub struct KeyExchangeCoordinator {
    registry: ConnectionRegistry,
}

impl KeyExchangeCoordinator {
    /// Create a coordinator over the shared registry.
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Record a session's latest bundle. Later publications overwrite
    /// earlier ones; subsequent exchanges always serve the newest.
    pub fn publish(&self, session_id: &str, bundle: String) {
        self.registry.store_bundle(session_id, bundle);
    }

    /// Handle an exchange request from `from_id` targeting `to_id`.
    ///
    /// The requester's bundle is stored and forwarded to the target. If the
    /// target has already published a bundle, it is sent back to the
    /// requester in the same call; otherwise the reverse direction completes
    /// whenever the target initiates its own exchange.
    ///
    /// # Errors
    ///
    /// Fails if the target is unknown or unreachable. The requester's bundle
    /// is still stored, so a retry after the target connects can succeed.
    pub fn request(
        &self,
        from_id: &str,
        to_id: &str,
        bundle: String,
    ) -> Result<(), RelayError> {
        self.registry.store_bundle(from_id, bundle.clone());

        self.registry.send_to(to_id, ServerFrame::PublicKey {
            from_id: from_id.to_string(),
            public_key: bundle,
        })?;

        match self.registry.bundle_of(to_id) {
            Some(reply) => {
                self.registry.send_to(from_id, ServerFrame::PublicKey {
                    from_id: to_id.to_string(),
                    public_key: reply,
                })?;
            },
            None => {
                debug!(from_id, to_id, "exchange target has not published yet");
            },
        }
        Ok(())
    }
}
