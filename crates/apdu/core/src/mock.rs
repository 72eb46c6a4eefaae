//! Scripted transport for tests
//!
//! Responses are served in FIFO order; every transmitted command is
//! recorded so tests can assert on ordering, which is security-relevant
//! for certificate loading.

use bytes::Bytes;

use crate::command::Command;
use crate::response::{Response, StatusWord};
use crate::transport::{CardTransport, TransportError};

/// In-memory transport answering from a pre-loaded script.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: std::collections::VecDeque<Response>,
    sent: Vec<Command>,
    resets: usize,
}

impl MockTransport {
    /// Empty transport; any transmit will fail with `CardGone`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response.
    pub fn push_response(&mut self, response: Response) -> &mut Self {
        self.script.push_back(response);
        self
    }

    /// Queue a `9000` response with the given payload.
    pub fn push_success(&mut self, payload: &[u8]) -> &mut Self {
        self.push_response(Response::success(Bytes::copy_from_slice(payload)))
    }

    /// Queue an empty response with the given status word.
    pub fn push_status(&mut self, status: StatusWord) -> &mut Self {
        self.push_response(Response::new(Bytes::new(), status))
    }

    /// Commands transmitted so far, in order.
    pub fn sent(&self) -> &[Command] {
        &self.sent
    }

    /// Number of resets requested.
    pub const fn resets(&self) -> usize {
        self.resets
    }
}

impl CardTransport for MockTransport {
    fn transmit(&mut self, command: &Command) -> Result<Response, TransportError> {
        self.sent.push(command.clone());
        self.script.pop_front().ok_or(TransportError::CardGone)
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.resets += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::status;

    #[test]
    fn serves_script_in_order() {
        let mut transport = MockTransport::new();
        transport.push_success(&[0xAA]);
        transport.push_status(status::SECURITY_STATUS_NOT_SATISFIED);

        let first = transport.transmit(&Command::new(0, 0x84, 0, 0)).unwrap();
        assert_eq!(first.payload().as_ref(), &[0xAA]);
        let second = transport.transmit(&Command::new(0, 0x82, 0, 0)).unwrap();
        assert_eq!(second.status(), status::SECURITY_STATUS_NOT_SATISFIED);
        assert!(matches!(
            transport.transmit(&Command::new(0, 0, 0, 0)),
            Err(TransportError::CardGone)
        ));
        assert_eq!(transport.sent().len(), 3);
    }
}
