//! Card transport seam
//!
//! The engine never talks to a reader directly; it drives whatever
//! implements [`CardTransport`]. Real implementations wrap PC/SC or a
//! platform NFC stack, tests use the scripted mock.

use bytes::Bytes;
use tracing::trace;

use crate::command::Command;
use crate::response::Response;

/// Errors raised below the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The reader or card went away mid-session.
    #[error("card was removed or the connection was lost")]
    CardGone,

    /// The response APDU was shorter than a status word.
    #[error("malformed response of {0} bytes")]
    MalformedResponse(usize),

    /// Driver-specific failure, already rendered to text.
    #[error("transport failure: {0}")]
    Device(String),
}

/// A synchronous, exclusively-owned channel to one card.
pub trait CardTransport {
    /// Transmit one command APDU and block until its response arrives.
    ///
    /// Implementations must complete the exchange once started; the caller
    /// handles cancellation between commands, never during one.
    fn transmit(&mut self, command: &Command) -> Result<Response, TransportError>;

    /// Transmit a pre-encoded APDU (used by the eID-Server relay loop).
    fn transmit_raw(&mut self, raw: &[u8]) -> Result<Bytes, TransportError> {
        trace!(apdu = %hex::encode(raw), "transmit raw");
        let command = split_raw(raw)?;
        self.transmit(&command).map(|r| r.to_bytes())
    }

    /// Reset the card connection, dropping any secure-messaging state.
    fn reset(&mut self) -> Result<(), TransportError>;
}

fn split_raw(raw: &[u8]) -> Result<Command, TransportError> {
    if raw.len() < 4 {
        return Err(TransportError::MalformedResponse(raw.len()));
    }
    let mut command = Command::new(raw[0], raw[1], raw[2], raw[3]);
    match raw.len() {
        4 => {}
        5 => command.le = Some(le_from_byte(raw[4])),
        n => {
            let lc = raw[4] as usize;
            if n == 5 + lc {
                command.data = Some(Bytes::copy_from_slice(&raw[5..]));
            } else if n == 5 + lc + 1 {
                command.data = Some(Bytes::copy_from_slice(&raw[5..5 + lc]));
                command.le = Some(le_from_byte(raw[n - 1]));
            } else {
                return Err(TransportError::Device(format!(
                    "inconsistent Lc in {n}-byte command"
                )));
            }
        }
    }
    Ok(command)
}

const fn le_from_byte(le: u8) -> u16 {
    if le == 0 { 256 } else { le as u16 }
}
