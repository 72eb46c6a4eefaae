//! PSO:Verify Certificate — load one chain certificate onto the card

use eac_apdu_core::{CardTransport, Command};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::cvc::CardVerifiableCertificate;
use crate::error::Result;

/// Largest data field of a short APDU.
const MAX_LC: usize = 255;

/// Present `certificate` to the card for verification against the key
/// selected by the preceding MSE:Set DST. Bodies longer than one short
/// APDU are sent with command chaining.
pub fn verify_certificate<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    certificate: &CardVerifiableCertificate,
) -> Result<()> {
    debug!(holder = %certificate.chr(), "loading certificate");
    let payload = certificate.body_and_signature();
    let mut chunks = payload.chunks(MAX_LC).peekable();
    while let Some(chunk) = chunks.next() {
        let cla = if chunks.peek().is_some() { 0x10 } else { 0x00 };
        let command = Command::new(cla, 0x2A, 0x00, 0xBE).with_data(chunk.to_vec());
        super::transmit(transport, cancel, command, "verify certificate")?;
    }
    Ok(())
}
