//! Card commands of the EAC protocol
//!
//! One module per instruction. Each command checks the cancellation token
//! before touching the card and maps a non-success status word into
//! [`Error::CardSecurity`] tagged with the protocol step, so callers see
//! the declared error taxonomy instead of raw status words.

use eac_apdu_core::{CardTransport, Command, Response};
use tracing::trace;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

mod external_authenticate;
mod general_authenticate;
mod get_challenge;
mod read_binary;
mod set_at;
mod set_dst;
mod verify_certificate;

pub use external_authenticate::external_authenticate;
pub use general_authenticate::{general_authenticate, GeneralAuthenticateResponse};
pub use get_challenge::{get_challenge, CHALLENGE_LEN};
pub use read_binary::read_file_with_sfi;
pub use set_at::{set_at_for_chip_authentication, set_at_for_terminal_authentication};
pub use set_dst::set_dst;
pub use verify_certificate::verify_certificate;

/// Transmit `command` and require a `9000` status.
pub(crate) fn transmit<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    command: Command,
    operation: &'static str,
) -> Result<Response> {
    cancel.checkpoint()?;
    trace!(operation, ins = format_args!("{:02X}", command.ins), "card command");
    let response = transport.transmit(&command)?;
    if response.is_success() {
        Ok(response)
    } else {
        Err(Error::CardSecurity {
            operation,
            status: response.status(),
        })
    }
}
