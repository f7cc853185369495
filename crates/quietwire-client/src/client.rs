//! Client state machine.
//!
//! Manages the local identity, one [`PeerSession`] per contact, and group
//! descriptors. Pure state machine - returns actions, caller handles I/O.

use std::collections::HashMap;

use quietwire_crypto::{Identity, PeerSession, codec};
use quietwire_proto::{ClientFrame, GroupPayload, ServerFrame};
use rand_core::CryptoRngCore;

use crate::{
    backoff::Backoff,
    error::ClientError,
    event::{ClientAction, ClientEvent},
};

/// A group descriptor as learned from the relay's creation broadcast.
/// Membership is fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// Display name.
    pub name: String,
    /// Full fixed membership, including this client.
    pub member_ids: Vec<String>,
    /// Creator session id, as stamped by the relay.
    pub creator_id: String,
}

/// Client state machine.
///
/// # Type Parameters
///
/// - `R`: cryptographic RNG. Production uses the OS RNG; tests use a seeded
///   ChaCha RNG for determinism.
pub struct Client<R: CryptoRngCore> {
    identity: Option<Identity>,
    session_id: Option<String>,
    peers: HashMap<String, PeerSession>,
    groups: HashMap<String, GroupInfo>,
    backoff: Backoff,
    rng: R,
}

impl<R: CryptoRngCore> Client<R> {
    /// Create a client with no identity yet.
    pub fn new(rng: R) -> Self {
        Self::with_backoff(rng, Backoff::default())
    }

    /// Create a client with a custom reconnect policy.
    pub fn with_backoff(rng: R, backoff: Backoff) -> Self {
        Self {
            identity: None,
            session_id: None,
            peers: HashMap::new(),
            groups: HashMap::new(),
            backoff,
            rng,
        }
    }

    /// Our relay-assigned session id, if registered.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Whether a peer session exists.
    pub fn has_peer(&self, peer_id: &str) -> bool {
        self.peers.contains_key(peer_id)
    }

    /// Fingerprint of a peer's encryption key, if a session exists.
    pub fn peer_fingerprint(&self, peer_id: &str) -> Option<&str> {
        self.peers.get(peer_id).map(PeerSession::fingerprint)
    }

    /// Descriptor of a known group.
    pub fn group(&self, group_id: &str) -> Option<&GroupInfo> {
        self.groups.get(group_id)
    }

    /// Fingerprint of our own published encryption key.
    pub fn own_fingerprint(&self) -> Result<String, ClientError> {
        let identity = self.identity.as_ref().ok_or(ClientError::NotInitialized)?;
        Ok(identity.fingerprint()?)
    }

    /// The exported public bundle as its JSON wire form.
    pub fn public_bundle_json(&self) -> Result<String, ClientError> {
        let identity = self.identity.as_ref().ok_or(ClientError::NotInitialized)?;
        Ok(identity.public_bundle()?.to_json()?)
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the event cannot be processed. Cryptographic
    /// failures are peer-scoped: they never invalidate the client state.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Initialize => self.handle_initialize(),
            ClientEvent::Connected => {
                self.backoff.reset();
                Ok(Vec::new())
            },
            ClientEvent::ConnectionLost => Ok(self.handle_connection_lost()),
            ClientEvent::FrameReceived(frame) => self.handle_frame(frame),
            ClientEvent::RequestExchange { peer_id } => self.handle_request_exchange(&peer_id),
            ClientEvent::SendMessage { peer_id, plaintext } => {
                self.handle_send_message(&peer_id, &plaintext)
            },
            ClientEvent::CreateGroup { group_id, name, member_ids } => {
                Ok(vec![ClientAction::Send(ClientFrame::CreateGroup {
                    group_id,
                    group_name: name,
                    member_ids,
                    creator_id: self.session_id.clone(),
                })])
            },
            ClientEvent::SendGroupMessage { group_id, plaintext } => {
                self.handle_send_group_message(&group_id, &plaintext)
            },
        }
    }

    /// Generate the local identity. Replaces any previous identity; existing
    /// peer sessions stay valid only for their already-derived keys, so a
    /// re-initialize clears them.
    fn handle_initialize(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        self.identity = Some(Identity::generate(&mut self.rng));
        self.peers.clear();

        if self.session_id.is_some() {
            let bundle = self.public_bundle_json()?;
            return Ok(vec![ClientAction::Send(ClientFrame::PublicKey { public_key: bundle })]);
        }
        Ok(Vec::new())
    }

    fn handle_connection_lost(&mut self) -> Vec<ClientAction> {
        // Session ids are ephemeral; the next welcome assigns a new one.
        self.session_id = None;
        match self.backoff.next_delay() {
            Some(delay) => vec![ClientAction::Reconnect { delay }],
            None => vec![ClientAction::ConnectionFailed],
        }
    }

    fn handle_request_exchange(&mut self, peer_id: &str) -> Result<Vec<ClientAction>, ClientError> {
        let bundle = self.public_bundle_json()?;
        Ok(vec![ClientAction::Send(ClientFrame::KeyExchange {
            to_id: peer_id.to_string(),
            public_key: bundle,
        })])
    }

    fn handle_send_message(
        &mut self,
        peer_id: &str,
        plaintext: &[u8],
    ) -> Result<Vec<ClientAction>, ClientError> {
        let identity = self.identity.as_ref().ok_or(ClientError::NotInitialized)?;
        let session = self
            .peers
            .get(peer_id)
            .ok_or_else(|| ClientError::NoPeerSession { peer_id: peer_id.to_string() })?;

        // Fresh IV per call; reuse under one key breaks confidentiality.
        let mut iv = [0u8; codec::IV_SIZE];
        self.rng.fill_bytes(&mut iv);

        let envelope = codec::encrypt_and_sign(identity, session, plaintext, iv)?;

        Ok(vec![ClientAction::Send(ClientFrame::ChatMessage {
            to_id: peer_id.to_string(),
            encrypted: envelope.ciphertext,
            signature: Some(envelope.signature),
        })])
    }

    fn handle_send_group_message(
        &mut self,
        group_id: &str,
        plaintext: &[u8],
    ) -> Result<Vec<ClientAction>, ClientError> {
        let identity = self.identity.as_ref().ok_or(ClientError::NotInitialized)?;
        let own_id = self.session_id.as_deref().ok_or(ClientError::NotRegistered)?;
        let group = self
            .groups
            .get(group_id)
            .ok_or_else(|| ClientError::UnknownGroup { group_id: group_id.to_string() })?;

        // All payloads are built before anything is emitted: a member with no
        // session fails the whole send instead of producing a partial batch.
        let mut payloads = Vec::new();
        for member in &group.member_ids {
            if member == own_id {
                continue;
            }
            let session = self
                .peers
                .get(member)
                .ok_or_else(|| ClientError::NoPeerSession { peer_id: member.clone() })?;

            let mut iv = [0u8; codec::IV_SIZE];
            self.rng.fill_bytes(&mut iv);
            let envelope = codec::encrypt_and_sign(identity, session, plaintext, iv)?;

            payloads.push(GroupPayload {
                to_id: member.clone(),
                encrypted: envelope.ciphertext,
                signature: envelope.signature,
            });
        }

        Ok(vec![ClientAction::Send(ClientFrame::GroupMessage {
            group_id: group_id.to_string(),
            encrypted_payloads: payloads,
        })])
    }

    fn handle_frame(&mut self, frame: ServerFrame) -> Result<Vec<ClientAction>, ClientError> {
        match frame {
            ServerFrame::Welcome { session_id } => self.handle_welcome(session_id),
            ServerFrame::PublicKey { from_id, public_key } => {
                self.handle_peer_key(&from_id, &public_key)
            },
            ServerFrame::ChatMessage { from_id, encrypted, signature } => {
                self.handle_chat_message(&from_id, &encrypted, signature.as_deref())
            },
            ServerFrame::GroupCreated { group_id, group_name, member_ids, creator_id } => {
                self.groups.insert(
                    group_id.clone(),
                    GroupInfo {
                        name: group_name.clone(),
                        member_ids: member_ids.clone(),
                        creator_id: creator_id.clone(),
                    },
                );
                Ok(vec![ClientAction::GroupJoined {
                    group_id,
                    name: group_name,
                    member_ids,
                    creator_id,
                }])
            },
            ServerFrame::GroupMessage { group_id, from_id, encrypted, signature } => {
                self.handle_group_message(&group_id, &from_id, &encrypted, &signature)
            },
            ServerFrame::Error { message } => Ok(vec![ClientAction::RelayErrorReported { message }]),
        }
    }

    fn handle_welcome(&mut self, session_id: String) -> Result<Vec<ClientAction>, ClientError> {
        self.session_id = Some(session_id.clone());
        self.backoff.reset();

        let mut actions = vec![ClientAction::SessionEstablished { session_id }];
        // Publish our bundle so later exchanges resolve in a single round.
        if self.identity.is_some() {
            let bundle = self.public_bundle_json()?;
            actions.push(ClientAction::Send(ClientFrame::PublicKey { public_key: bundle }));
        }
        Ok(actions)
    }

    /// Store a peer's bundle and derive the shared key immediately.
    ///
    /// Failure leaves no session behind. Re-receiving the same bundle
    /// re-derives the same key, so the exchange is idempotent.
    fn handle_peer_key(
        &mut self,
        peer_id: &str,
        bundle: &str,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let identity = self.identity.as_ref().ok_or(ClientError::NotInitialized)?;
        let session = PeerSession::derive(identity, peer_id, bundle)?;
        let fingerprint = session.fingerprint().to_string();
        self.peers.insert(peer_id.to_string(), session);

        Ok(vec![ClientAction::PeerEstablished { peer_id: peer_id.to_string(), fingerprint }])
    }

    fn handle_chat_message(
        &mut self,
        from_id: &str,
        encrypted: &str,
        signature: Option<&str>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let session = self
            .peers
            .get(from_id)
            .ok_or_else(|| ClientError::NoPeerSession { peer_id: from_id.to_string() })?;

        let (plaintext, authenticated) = match signature {
            Some(sig) => (codec::verify_and_decrypt(session, encrypted, sig)?, true),
            // Legacy unsigned envelope: no authenticity guarantee.
            None => (codec::decrypt_unsigned(session, encrypted)?, false),
        };

        Ok(vec![ClientAction::DeliverMessage {
            from_id: from_id.to_string(),
            plaintext,
            authenticated,
        }])
    }

    fn handle_group_message(
        &mut self,
        group_id: &str,
        from_id: &str,
        encrypted: &str,
        signature: &str,
    ) -> Result<Vec<ClientAction>, ClientError> {
        let session = self
            .peers
            .get(from_id)
            .ok_or_else(|| ClientError::NoPeerSession { peer_id: from_id.to_string() })?;

        let plaintext = codec::verify_and_decrypt(session, encrypted, signature)?;

        Ok(vec![ClientAction::DeliverGroupMessage {
            group_id: group_id.to_string(),
            from_id: from_id.to_string(),
            plaintext,
        }])
    }
}

impl<R: CryptoRngCore> std::fmt::Debug for Client<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("initialized", &self.identity.is_some())
            .field("session_id", &self.session_id)
            .field("peer_count", &self.peers.len())
            .field("group_count", &self.groups.len())
            .finish_non_exhaustive()
    }
}
