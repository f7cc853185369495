//! Per-connection WebSocket actor.
//!
//! One task per client. The task owns the socket and a receiver for frames
//! other components route to this session; a `select!` loop interleaves
//! inbound traffic, outbound delivery, and heartbeats. Inbound frames are
//! processed sequentially in arrival order, so per-sender ordering holds
//! end to end.
//!
//! Failure policy at the edge:
//! - malformed JSON or unknown `type`: dropped silently, connection lives
//! - structural violations and routing failures: sanitized `error` frame back
//! - transport errors, missed heartbeat: connection torn down and
//!   unregistered, messages to this id fail from that point on

use futures_util::{SinkExt, StreamExt};
use quietwire_proto::{ClientFrame, ServerFrame, decode_client_frame, encode_frame};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{WebSocketStream, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{
    config::ServerConfig,
    error::{RelayError, ServerError},
    exchange::KeyExchangeCoordinator,
    rate_limit::RateLimiter,
    registry::{ConnectionRegistry, ConnectionState},
    relay::MessageRelay,
};

/// Shared handles a connection needs to serve frames.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionContext {
    pub registry: ConnectionRegistry,
    pub exchange: KeyExchangeCoordinator,
    pub relay: MessageRelay,
    pub config: ServerConfig,
}

/// Drive one client connection to completion.
pub(crate) async fn serve(
    stream: WebSocketStream<TcpStream>,
    ctx: ConnectionContext,
) -> Result<(), ServerError> {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let session_id = ctx.registry.register(outbound_tx)?;
    info!(session_id, "client connected");

    // First frame on every connection, before anything else can be routed.
    ctx.registry
        .send_to(&session_id, ServerFrame::Welcome { session_id: session_id.clone() })
        .map_err(|e| ServerError::Internal(format!("welcome undeliverable: {e}")))?;

    let (mut ws_tx, mut ws_rx) = stream.split();
    let mut heartbeat = tokio::time::interval(ctx.config.heartbeat_interval);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    heartbeat.tick().await;

    let mut limiter = RateLimiter::new(ctx.config.rate_capacity, ctx.config.rate_refill_per_sec);
    let mut awaiting_pong = false;
    let mut saw_frame = false;

    let result = loop {
        tokio::select! {
            Some(frame) = outbound_rx.recv() => {
                let json = match encode_frame(&frame) {
                    Ok(json) => json,
                    Err(err) => {
                        warn!(session_id, %err, "dropping unencodable frame");
                        continue;
                    },
                };
                if let Err(err) = ws_tx.send(Message::Text(json)).await {
                    break Err(ServerError::Transport(err.to_string()));
                }
            },

            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        saw_frame = true;
                        handle_inbound(text.as_bytes(), &session_id, &ctx, &mut limiter);
                    },
                    Some(Ok(Message::Binary(bytes))) => {
                        saw_frame = true;
                        handle_inbound(&bytes, &session_id, &ctx, &mut limiter);
                    },
                    Some(Ok(Message::Ping(payload))) => {
                        if let Err(err) = ws_tx.send(Message::Pong(payload)).await {
                            break Err(ServerError::Transport(err.to_string()));
                        }
                    },
                    Some(Ok(Message::Pong(_))) => {
                        awaiting_pong = false;
                    },
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    Some(Ok(Message::Frame(_))) => {},
                    Some(Err(err)) => break Err(ServerError::Transport(err.to_string())),
                }
            },

            _ = heartbeat.tick() => {
                if awaiting_pong {
                    debug!(session_id, "heartbeat missed, closing");
                    break Ok(());
                }
                let state = if saw_frame { ConnectionState::Active } else { ConnectionState::Idle };
                ctx.registry.set_state(&session_id, state);
                saw_frame = false;

                awaiting_pong = true;
                if let Err(err) = ws_tx.send(Message::Ping(Vec::new())).await {
                    break Err(ServerError::Transport(err.to_string()));
                }
            },
        }
    };

    // Unregister before returning: routing to this id must fail immediately,
    // even while the socket itself lingers in close handshake.
    ctx.registry.unregister(&session_id);
    info!(session_id, "client disconnected");
    result
}

/// Decode, validate, and dispatch one inbound payload. Routing errors go
/// back to the sender as sanitized `error` frames; decode failures are
/// dropped without response.
fn handle_inbound(
    bytes: &[u8],
    session_id: &str,
    ctx: &ConnectionContext,
    limiter: &mut RateLimiter,
) {
    let outcome = process_frame(bytes, session_id, ctx, limiter);
    if let Err(err) = outcome {
        debug!(session_id, %err, "rejecting frame");
        let report = ServerFrame::Error { message: err.to_string() };
        if ctx.registry.send_to(session_id, report).is_err() {
            debug!(session_id, "sender gone before error report");
        }
    }
    ctx.registry.set_state(session_id, ConnectionState::Active);
}

fn process_frame(
    bytes: &[u8],
    session_id: &str,
    ctx: &ConnectionContext,
    limiter: &mut RateLimiter,
) -> Result<(), RelayError> {
    if bytes.len() > ctx.config.max_frame_bytes {
        return Err(quietwire_proto::FrameViolation::PayloadTooLarge.into());
    }
    if !limiter.try_acquire() {
        return Err(RelayError::RateLimited);
    }

    let frame = match decode_client_frame(bytes) {
        Ok(frame) => frame,
        Err(err) => {
            // Not a protocol participant's mistake worth answering; drop.
            debug!(session_id, %err, "undecodable frame dropped");
            return Ok(());
        },
    };
    ctx.config.limits.check(&frame)?;

    dispatch(frame, session_id, ctx)
}

fn dispatch(
    frame: ClientFrame,
    session_id: &str,
    ctx: &ConnectionContext,
) -> Result<(), RelayError> {
    match frame {
        ClientFrame::PublicKey { public_key } => {
            ctx.exchange.publish(session_id, public_key);
            Ok(())
        },
        ClientFrame::KeyExchange { to_id, public_key } => {
            ctx.exchange.request(session_id, &to_id, public_key)
        },
        ClientFrame::ChatMessage { to_id, encrypted, signature } => {
            ctx.relay.relay_chat(session_id, &to_id, encrypted, signature)
        },
        // The self-reported creatorID is discarded; the authenticated
        // session id is the creator.
        ClientFrame::CreateGroup { group_id, group_name, member_ids, creator_id: _ } => {
            ctx.relay.create_group(session_id, &group_id, &group_name, &member_ids)
        },
        ClientFrame::GroupMessage { group_id, encrypted_payloads } => {
            ctx.relay.relay_group(session_id, &group_id, &encrypted_payloads).map(|_| ())
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::groups::GroupTable;

    fn context() -> ConnectionContext {
        let registry = ConnectionRegistry::new();
        ConnectionContext {
            exchange: KeyExchangeCoordinator::new(registry.clone()),
            relay: MessageRelay::new(registry.clone(), GroupTable::new()),
            registry,
            config: ServerConfig::default(),
        }
    }

    fn registered(ctx: &ConnectionContext) -> (String, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ctx.registry.register(tx).unwrap(), rx)
    }

    #[test]
    fn malformed_json_is_dropped_without_error_frame() {
        let ctx = context();
        let (id, mut rx) = registered(&ctx);
        let mut limiter = RateLimiter::new(10, 10.0);

        handle_inbound(b"{not json", &id, &ctx, &mut limiter);
        handle_inbound(br#"{"type":"warp","x":1}"#, &id, &ctx, &mut limiter);

        assert!(rx.try_recv().is_err());
        assert!(ctx.registry.is_registered(&id));
    }

    #[test]
    fn routing_failure_reports_sanitized_error() {
        let ctx = context();
        let (id, mut rx) = registered(&ctx);
        let mut limiter = RateLimiter::new(10, 10.0);

        let frame = br#"{"type":"chatmessage","toID":"ghost","encrypted":"AAAA"}"#;
        handle_inbound(frame, &id, &ctx, &mut limiter);

        let ServerFrame::Error { message } = rx.try_recv().unwrap() else {
            panic!("expected error frame");
        };
        assert_eq!(message, "client ghost is unavailable");
    }

    #[test]
    fn oversized_raw_frame_is_rejected() {
        let ctx = ConnectionContext {
            config: ServerConfig { max_frame_bytes: 16, ..ServerConfig::default() },
            ..context()
        };
        let (id, mut rx) = registered(&ctx);
        let mut limiter = RateLimiter::new(10, 10.0);

        handle_inbound(&vec![b'x'; 32], &id, &ctx, &mut limiter);

        let ServerFrame::Error { message } = rx.try_recv().unwrap() else {
            panic!("expected error frame");
        };
        assert_eq!(message, "payload too large");
    }

    #[test]
    fn rate_limited_frames_get_an_error_frame() {
        let ctx = context();
        let (id, mut rx) = registered(&ctx);
        let mut limiter = RateLimiter::new(1, 0.0);

        let frame = br#"{"type":"publickey","publicKey":"AAAA"}"#;
        handle_inbound(frame, &id, &ctx, &mut limiter);
        assert!(rx.try_recv().is_err());

        handle_inbound(frame, &id, &ctx, &mut limiter);
        let ServerFrame::Error { message } = rx.try_recv().unwrap() else {
            panic!("expected error frame");
        };
        assert_eq!(message, "rate limit exceeded");
    }

    #[test]
    fn dispatch_stamps_authenticated_creator() {
        let ctx = context();
        let (alice, mut a_rx) = registered(&ctx);
        let mut limiter = RateLimiter::new(10, 10.0);

        // Claims someone else as creator; the stamp must win.
        let frame = format!(
            r#"{{"type":"creategroup","groupID":"g1","groupName":"ops","memberIDs":["{alice}"],"creatorID":"mallory"}}"#
        );
        handle_inbound(frame.as_bytes(), &alice, &ctx, &mut limiter);

        let ServerFrame::GroupCreated { creator_id, .. } = a_rx.try_recv().unwrap() else {
            panic!("expected groupcreated frame");
        };
        assert_eq!(creator_id, alice);
    }

    #[test]
    fn frames_are_processed_in_arrival_order() {
        let ctx = context();
        let (alice, _a_rx) = registered(&ctx);
        let (bob, mut b_rx) = registered(&ctx);
        let mut limiter = RateLimiter::new(10, 10.0);

        for n in 0..3 {
            let frame = format!(
                r#"{{"type":"chatmessage","toID":"{bob}","encrypted":"ct{n}"}}"#
            );
            handle_inbound(frame.as_bytes(), &alice, &ctx, &mut limiter);
        }
        for n in 0..3 {
            let ServerFrame::ChatMessage { encrypted, .. } = b_rx.try_recv().unwrap() else {
                panic!("expected chatmessage");
            };
            assert_eq!(encrypted, format!("ct{n}"));
        }
    }
}
