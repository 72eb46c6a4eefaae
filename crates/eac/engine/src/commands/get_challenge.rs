//! Get Challenge — obtain the card's 8-byte random value

use eac_apdu_core::{CardTransport, Command};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// Length of the challenge used by Terminal Authentication.
pub const CHALLENGE_LEN: usize = 8;

/// Request a fresh challenge. Each challenge must be consumed by exactly
/// one External Authenticate; a new one is requested for every retry.
pub fn get_challenge<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
) -> Result<[u8; CHALLENGE_LEN]> {
    let command = Command::new(0x00, 0x84, 0x00, 0x00).with_le(CHALLENGE_LEN as u16);
    let response = super::transmit(transport, cancel, command, "get challenge")?;
    let payload = response.payload();
    payload
        .as_ref()
        .try_into()
        .map_err(|_| Error::ProtocolDataMissing("challenge of unexpected length"))
}
