//! General Authenticate — ephemeral key agreement with the chip

use eac_apdu_core::{CardTransport, Command};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::tlv;

/// Proof material returned by the card after key agreement. The engine
/// never derives the shared secret itself; both values are relayed to the
/// party holding the matching ephemeral private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralAuthenticateResponse {
    /// Fresh nonce chosen by the card
    pub nonce: Vec<u8>,
    /// Authentication token computed over the derived secret
    pub token: Vec<u8>,
}

/// Send the ephemeral public key inside a dynamic authentication data
/// object and parse the card's nonce and token. Both response fields are
/// structurally required; a response missing either is non-conformant.
pub fn general_authenticate<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    ephemeral_public_key: &[u8],
) -> Result<GeneralAuthenticateResponse> {
    let data = tlv::encode(&[0x7C], &tlv::encode(&[0x80], ephemeral_public_key));
    let command = Command::new(0x00, 0x86, 0x00, 0x00)
        .with_data(data)
        .with_le(256);
    let response = super::transmit(transport, cancel, command, "general authenticate")?;

    let dynamic = tlv::parse(response.payload())?;
    let fields = tlv::children(&dynamic)?;
    let nonce = tlv::primitive(tlv::expect_child(fields, 0x81, "key agreement nonce")?)?;
    let token = tlv::primitive(tlv::expect_child(fields, 0x82, "authentication token")?)?;
    if nonce.is_empty() || token.is_empty() {
        return Err(Error::ProtocolDataMissing("empty key agreement response field"));
    }
    Ok(GeneralAuthenticateResponse {
        nonce: nonce.to_vec(),
        token: token.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use eac_apdu_core::mock::MockTransport;

    use super::*;

    fn dynamic_response(fields: &[(u8, &[u8])]) -> Vec<u8> {
        let mut inner = Vec::new();
        for (tag, value) in fields {
            inner.extend_from_slice(&tlv::encode(&[*tag], value));
        }
        tlv::encode(&[0x7C], &inner)
    }

    #[test]
    fn parses_nonce_and_token() {
        let mut card = MockTransport::new();
        card.push_success(&dynamic_response(&[(0x81, &[0xAA; 8]), (0x82, &[0xBB; 8])]));

        let key = [0x04; 65];
        let result = general_authenticate(&mut card, &CancelToken::new(), &key).unwrap();
        assert_eq!(result.nonce, vec![0xAA; 8]);
        assert_eq!(result.token, vec![0xBB; 8]);

        let sent = &card.sent()[0];
        assert_eq!((sent.cla, sent.ins), (0x00, 0x86));
        let expected = tlv::encode(&[0x7C], &tlv::encode(&[0x80], &key));
        assert_eq!(sent.data.as_ref().unwrap().as_ref(), expected);
        assert_eq!(sent.le, Some(256));
    }

    #[test]
    fn missing_nonce_or_token_is_a_protocol_error() {
        for fields in [
            vec![(0x82u8, [0xBB; 8].as_slice())],
            vec![(0x81u8, [0xAA; 8].as_slice())],
        ] {
            let mut card = MockTransport::new();
            card.push_success(&dynamic_response(&fields));
            assert!(matches!(
                general_authenticate(&mut card, &CancelToken::new(), &[0x04; 65]),
                Err(Error::ProtocolDataMissing(_))
            ));
        }
    }
}
