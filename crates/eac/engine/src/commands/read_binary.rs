//! READ BINARY with a short file identifier
//!
//! EF.CardSecurity is read directly with chunked short APDUs. The file's
//! access rules differ from ordinary datasets, so no cached file
//! abstraction sits in between; the raw bytes are what gets signed over.

use eac_apdu_core::{status, CardTransport, Command};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// Chunk size per READ BINARY.
const CHUNK: usize = 256;
/// Offsets are 15-bit once the SFI selection byte is used up.
const MAX_OFFSET: usize = 0x7FFF;

/// Read a transparent file selected by short file identifier, from offset
/// zero to end of file.
pub fn read_file_with_sfi<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    sfi: u8,
) -> Result<Vec<u8>> {
    let mut content: Vec<u8> = Vec::new();
    loop {
        cancel.checkpoint()?;
        // The first command selects the file via P1 bit 8 + SFI; follow-up
        // reads address the then-current file by plain offset.
        let (p1, p2) = if content.is_empty() {
            (0x80 | (sfi & 0x1F), 0x00)
        } else {
            let offset = content.len() as u16;
            ((offset >> 8) as u8, (offset & 0xFF) as u8)
        };
        let command = Command::new(0x00, 0xB0, p1, p2).with_le(CHUNK as u16);
        let response = transport.transmit(&command)?;

        match response.status() {
            status::SUCCESS => {
                content.extend_from_slice(response.payload());
                if response.payload().len() < CHUNK {
                    break;
                }
            }
            status::END_OF_FILE => {
                content.extend_from_slice(response.payload());
                break;
            }
            status::WRONG_P1P2 if !content.is_empty() => break,
            other => {
                return Err(Error::CardSecurity {
                    operation: "read binary",
                    status: other,
                })
            }
        }
        if content.len() >= MAX_OFFSET {
            break;
        }
    }
    debug!(sfi, len = content.len(), "file read");
    Ok(content)
}

#[cfg(test)]
mod tests {
    use eac_apdu_core::mock::MockTransport;
    use eac_apdu_core::Response;

    use super::*;

    #[test]
    fn single_chunk_file() {
        let mut card = MockTransport::new();
        card.push_success(&[0x42; 100]);
        let content = read_file_with_sfi(&mut card, &CancelToken::new(), 0x1D).unwrap();
        assert_eq!(content, vec![0x42; 100]);

        let sent = &card.sent()[0];
        assert_eq!((sent.ins, sent.p1, sent.p2), (0xB0, 0x9D, 0x00));
        assert_eq!(sent.le, Some(256));
    }

    #[test]
    fn multi_chunk_file_advances_the_offset() {
        let mut card = MockTransport::new();
        card.push_success(&[0x01; 256]);
        card.push_success(&[0x02; 256]);
        card.push_response(Response::new(
            bytes::Bytes::from(vec![0x03; 10]),
            status::END_OF_FILE,
        ));

        let content = read_file_with_sfi(&mut card, &CancelToken::new(), 0x1D).unwrap();
        assert_eq!(content.len(), 522);
        assert_eq!(&content[510..515], &[0x02, 0x02, 0x03, 0x03, 0x03]);

        let sent = card.sent();
        assert_eq!((sent[0].p1, sent[0].p2), (0x9D, 0x00));
        assert_eq!((sent[1].p1, sent[1].p2), (0x01, 0x00));
        assert_eq!((sent[2].p1, sent[2].p2), (0x02, 0x00));
    }

    #[test]
    fn exact_multiple_terminates_on_wrong_offset() {
        let mut card = MockTransport::new();
        card.push_success(&[0x01; 256]);
        card.push_status(status::WRONG_P1P2);
        let content = read_file_with_sfi(&mut card, &CancelToken::new(), 0x1D).unwrap();
        assert_eq!(content.len(), 256);
    }

    #[test]
    fn access_denial_is_an_error() {
        let mut card = MockTransport::new();
        card.push_status(status::SECURITY_STATUS_NOT_SATISFIED);
        assert!(matches!(
            read_file_with_sfi(&mut card, &CancelToken::new(), 0x1D),
            Err(Error::CardSecurity { .. })
        ));
    }
}
