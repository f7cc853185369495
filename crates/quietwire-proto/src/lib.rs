//! Quietwire Wire Protocol
//!
//! JSON frames exchanged between clients and the relay. Every frame carries a
//! mandatory `type` discriminator; frames are modeled as exhaustively-matched
//! tagged unions so an unrecognized tag fails deserialization instead of
//! being partially interpreted.
//!
//! # Design
//!
//! The relay treats `encrypted` and `signature` fields as opaque strings. No
//! type in this crate can hold secret material - bundles and envelopes are
//! public or ciphertext by construction.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod frames;
pub mod limits;

pub use frames::{ClientFrame, GroupPayload, ServerFrame, decode_client_frame, encode_frame};
pub use limits::{FrameLimits, FrameViolation, valid_peer_id};
