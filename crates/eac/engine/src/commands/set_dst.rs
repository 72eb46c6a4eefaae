//! MSE:Set DST — select the public key for certificate verification

use eac_apdu_core::{CardTransport, Command};

use crate::cancel::CancelToken;
use crate::cvc::PublicKeyReference;
use crate::error::Result;
use crate::tlv;

/// Point the card's digital-signature template at the issuer key named by
/// `car`. Must precede the matching certificate verification.
pub fn set_dst<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    car: &PublicKeyReference,
) -> Result<()> {
    let data = tlv::encode(&[0x83], car.as_bytes());
    let command = Command::new(0x00, 0x22, 0x81, 0xB6).with_data(data);
    super::transmit(transport, cancel, command, "set security environment for certificate")?;
    Ok(())
}
