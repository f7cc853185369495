//! Quietwire client state machine.
//!
//! The [`Client`] is a pure state machine: the embedder feeds it events
//! (frames from the relay, user intents, connection transitions) and executes
//! the actions it returns (frames to send, plaintexts to deliver, reconnect
//! scheduling). No I/O happens here, which keeps every protocol decision
//! deterministic and testable with a seeded RNG.
//!
//! ```text
//! transport ──events──▶ Client ──actions──▶ transport / UI
//!                        │
//!                        ├─ Identity        (ECDH + ECDSA key pairs)
//!                        ├─ PeerSession map (one derived AES key per peer)
//!                        ├─ Group map       (static membership descriptors)
//!                        └─ Backoff         (bounded reconnect policy)
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod backoff;
mod client;
mod error;
mod event;

pub use backoff::Backoff;
pub use client::{Client, GroupInfo};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent};
