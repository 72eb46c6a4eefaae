//! MSE:Set AT — select the authentication template
//!
//! Two variants: one preceding External Authenticate (Terminal
//! Authentication) and one preceding General Authenticate (Chip
//! Authentication). They differ in P1 and in the carried data objects.

use eac_apdu_core::{CardTransport, Command};

use crate::cancel::CancelToken;
use crate::cvc::PublicKeyReference;
use crate::error::Result;
use crate::tlv;

/// Prepare the card for External Authenticate: protocol OID, the terminal
/// certificate's holder reference, the compressed ephemeral key the
/// signature is bound to, and optional authenticated auxiliary data
/// (already encoded as a `67` template).
pub fn set_at_for_terminal_authentication<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    protocol_oid: &[u8],
    terminal_chr: &PublicKeyReference,
    compressed_ephemeral_key: &[u8],
    auxiliary_data: Option<&[u8]>,
) -> Result<()> {
    let mut data = tlv::encode(&[0x80], protocol_oid);
    data.extend_from_slice(&tlv::encode(&[0x83], terminal_chr.as_bytes()));
    data.extend_from_slice(&tlv::encode(&[0x91], compressed_ephemeral_key));
    if let Some(auxiliary) = auxiliary_data {
        data.extend_from_slice(auxiliary);
    }
    let command = Command::new(0x00, 0x22, 0x81, 0xA4).with_data(data);
    super::transmit(
        transport,
        cancel,
        command,
        "set security environment for terminal authentication",
    )?;
    Ok(())
}

/// Prepare the card for General Authenticate: key-agreement protocol OID
/// and, when the card holds several chip keys, the private key reference.
pub fn set_at_for_chip_authentication<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    protocol_oid: &[u8],
    key_id: Option<u8>,
) -> Result<()> {
    let mut data = tlv::encode(&[0x80], protocol_oid);
    if let Some(key_id) = key_id {
        data.extend_from_slice(&tlv::encode(&[0x84], &[key_id]));
    }
    let command = Command::new(0x00, 0x22, 0x41, 0xA4).with_data(data);
    super::transmit(
        transport,
        cancel,
        command,
        "set security environment for chip authentication",
    )?;
    Ok(())
}
