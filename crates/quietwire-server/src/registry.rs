//! Connection registry: session id allocation and frame routing.
//!
//! The registry is the single shared map from session id to live connection.
//! Every mutation happens under one lock, so routing a frame and tearing a
//! connection down cannot interleave: a route either reaches a live channel
//! or fails, never a half-removed record.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};

use quietwire_proto::ServerFrame;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{RelayError, ServerError};

/// Lifecycle of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered, no application frame seen yet.
    Registered,
    /// Recently exchanged application frames.
    Active,
    /// Alive (answering heartbeats) but quiet.
    Idle,
    /// Tear-down in progress; no further frames are routed to it.
    Closed,
}

#[derive(Debug)]
struct ConnectionRecord {
    sender: UnboundedSender<ServerFrame>,
    bundle: Option<String>,
    state: ConnectionState,
    connected_at: Instant,
}

/// Shared session registry. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Mutex<HashMap<String, ConnectionRecord>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ConnectionRecord>> {
        // A poisoned map is still structurally sound; keep serving.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new connection and return its fresh session id.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Internal` if the OS entropy source fails.
    pub fn register(
        &self,
        sender: UnboundedSender<ServerFrame>,
    ) -> Result<String, ServerError> {
        let mut map = self.lock();
        let session_id = loop {
            let candidate = random_session_id()?;
            if !map.contains_key(&candidate) {
                break candidate;
            }
        };
        map.insert(session_id.clone(), ConnectionRecord {
            sender,
            bundle: None,
            state: ConnectionState::Registered,
            connected_at: Instant::now(),
        });
        Ok(session_id)
    }

    /// Remove a connection. Routing to this id fails from this point on.
    pub fn unregister(&self, session_id: &str) {
        let mut map = self.lock();
        if let Some(record) = map.get_mut(session_id) {
            record.state = ConnectionState::Closed;
        }
        map.remove(session_id);
    }

    /// Route a frame to a session.
    ///
    /// # Errors
    ///
    /// `PeerNotFound` if the id is unknown, `RecipientUnavailable` if the
    /// connection's channel is gone (the stale record is removed).
    pub fn send_to(&self, session_id: &str, frame: ServerFrame) -> Result<(), RelayError> {
        let mut map = self.lock();
        let record = map
            .get(session_id)
            .ok_or_else(|| RelayError::PeerNotFound { peer_id: session_id.to_string() })?;

        if record.state == ConnectionState::Closed || record.sender.send(frame).is_err() {
            map.remove(session_id);
            return Err(RelayError::RecipientUnavailable { peer_id: session_id.to_string() });
        }
        Ok(())
    }

    /// Store the latest published key bundle for a session.
    pub fn store_bundle(&self, session_id: &str, bundle: String) {
        if let Some(record) = self.lock().get_mut(session_id) {
            record.bundle = Some(bundle);
        }
    }

    /// The last bundle a session published, if any.
    pub fn bundle_of(&self, session_id: &str) -> Option<String> {
        self.lock().get(session_id).and_then(|r| r.bundle.clone())
    }

    /// Transition a session's lifecycle state. No-op on unknown ids and on
    /// records already marked [`ConnectionState::Closed`].
    pub fn set_state(&self, session_id: &str, state: ConnectionState) {
        if let Some(record) = self.lock().get_mut(session_id) {
            if record.state != ConnectionState::Closed {
                record.state = state;
            }
        }
    }

    /// Current lifecycle state of a session.
    pub fn state_of(&self, session_id: &str) -> Option<ConnectionState> {
        self.lock().get(session_id).map(|r| r.state)
    }

    /// How long a session has been connected.
    pub fn uptime_of(&self, session_id: &str) -> Option<std::time::Duration> {
        self.lock().get(session_id).map(|r| r.connected_at.elapsed())
    }

    /// Whether a session id is currently registered.
    pub fn is_registered(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// 16 random bytes from the OS, hex-encoded: 32-character session ids.
fn random_session_id() -> Result<String, ServerError> {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut raw = [0u8; 16];
    getrandom::getrandom(&mut raw)
        .map_err(|e| ServerError::Internal(format!("entropy source failed: {e}")))?;

    let mut id = String::with_capacity(32);
    for byte in raw {
        id.push(HEX[(byte >> 4) as usize] as char);
        id.push(HEX[(byte & 0x0f) as usize] as char);
    }
    Ok(id)
}
