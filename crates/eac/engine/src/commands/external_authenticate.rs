//! External Authenticate — prove possession of the terminal key

use eac_apdu_core::{CardTransport, Command};

use crate::cancel::CancelToken;
use crate::error::Result;

/// Send the externally produced signature over the terminal
/// authentication input. The card verifies it against the terminal
/// certificate loaded by the preceding chain verification; a failure here
/// means terminal authentication has failed and must not be retried with
/// the same challenge.
pub fn external_authenticate<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    signature: &[u8],
) -> Result<()> {
    let command = Command::new(0x00, 0x82, 0x00, 0x00).with_data(signature.to_vec());
    super::transmit(transport, cancel, command, "external authenticate")?;
    Ok(())
}
