//! Terminal Authentication
//!
//! Sequencing of the card-side TA steps. The order is security-bearing:
//! the card accumulates trust certificate by certificate and refuses any
//! step whose predecessor was skipped or failed. The terminal's private
//! signing key is held by the eID-Server; this module only produces the
//! data to be signed and relays the finished signature.

use eac_apdu_core::CardTransport;
use tracing::{debug, instrument};

use crate::cancel::CancelToken;
use crate::commands;
use crate::cvc::{CvcChain, PublicKeyReference};
use crate::error::Result;

/// TA step 1: load every chain certificate onto the card, root to leaf.
/// A self-signed anchor is skipped; the card already trusts that key.
#[instrument(skip_all, fields(leaf = %chain.leaf().chr()))]
pub fn load_chain<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    chain: &CvcChain,
) -> Result<()> {
    for certificate in chain.card_certificates() {
        commands::set_dst(transport, cancel, certificate.car())?;
        commands::verify_certificate(transport, cancel, certificate)?;
    }
    debug!("certificate chain accepted by the card");
    Ok(())
}

/// TA step 2: fetch the challenge the signature must cover.
pub fn request_challenge<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
) -> Result<[u8; commands::CHALLENGE_LEN]> {
    commands::get_challenge(transport, cancel)
}

/// TA step 3: the exact byte string the external signer signs — the
/// compressed ephemeral key, the card challenge, and any authenticated
/// auxiliary data, concatenated in that order.
pub fn signing_input(
    compressed_ephemeral_key: &[u8],
    challenge: &[u8],
    auxiliary_data: Option<&[u8]>,
) -> Vec<u8> {
    let mut input = Vec::with_capacity(
        compressed_ephemeral_key.len()
            + challenge.len()
            + auxiliary_data.map_or(0, <[u8]>::len),
    );
    input.extend_from_slice(compressed_ephemeral_key);
    input.extend_from_slice(challenge);
    if let Some(auxiliary) = auxiliary_data {
        input.extend_from_slice(auxiliary);
    }
    input
}

/// TA step 4: bind the signature to the ephemeral key and present it.
/// Succeeds only if the card accepts the signature under the terminal
/// certificate it verified in step 1.
#[instrument(skip_all, fields(terminal = %terminal_chr))]
pub fn authenticate<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    protocol_oid: &[u8],
    terminal_chr: &PublicKeyReference,
    compressed_ephemeral_key: &[u8],
    auxiliary_data: Option<&[u8]>,
    signature: &[u8],
) -> Result<()> {
    commands::set_at_for_terminal_authentication(
        transport,
        cancel,
        protocol_oid,
        terminal_chr,
        compressed_ephemeral_key,
        auxiliary_data,
    )?;
    commands::external_authenticate(transport, cancel, signature)?;
    debug!("terminal authentication succeeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_input_concatenation() {
        let key = [0x01; 32];
        let challenge = [0x02; 8];
        let aux = [0x67, 0x02, 0x73, 0x00];

        let with_aux = signing_input(&key, &challenge, Some(&aux));
        assert_eq!(with_aux.len(), 44);
        assert_eq!(&with_aux[..32], &key);
        assert_eq!(&with_aux[32..40], &challenge);
        assert_eq!(&with_aux[40..], &aux);

        let without_aux = signing_input(&key, &challenge, None);
        assert_eq!(without_aux.len(), 40);
    }
}
