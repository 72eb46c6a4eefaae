//! APDU command and response types for driving smart cards
//!
//! This crate carries the small ISO/IEC 7816-4 subset the EAC engine needs:
//! building command APDUs, parsing response APDUs with their status words,
//! and the [`CardTransport`] seam behind which the actual reader driver
//! (PC/SC, NFC, test double) lives.
//!
//! The transport is deliberately a synchronous, exclusively-owned object:
//! a card channel is never safe for concurrent use, so the engine owns the
//! transport for the whole duration of an authentication attempt.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod response;
pub mod transport;

#[cfg(feature = "mock")]
pub mod mock;

pub use command::Command;
pub use response::{Response, StatusWord, status};
pub use transport::{CardTransport, TransportError};
