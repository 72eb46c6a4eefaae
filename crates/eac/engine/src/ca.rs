//! Chip Authentication
//!
//! Key agreement with the chip over the ephemeral key pair held by the
//! eID-Server. The engine forwards the public half to the card, collects
//! the nonce and authentication token, and relays them together with
//! EF.CardSecurity; it never derives the shared secret and never sees the
//! resulting session keys.

use eac_apdu_core::CardTransport;
use tracing::{debug, instrument};

use crate::cancel::CancelToken;
use crate::commands;
use crate::crypto::{CurveId, OID_CA_ECDH, OID_STANDARDIZED_DOMAIN_PARAMETERS};
use crate::error::{Error, Result};
use crate::messages::CaResult;
use crate::tlv;

/// Short file identifier of EF.CardSecurity.
pub const EF_CARD_SECURITY_SFI: u8 = 0x1D;

/// Chip Authentication parameters announced by the card in EF.CardAccess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaParameters {
    /// Full protocol suite OID (key agreement plus cipher)
    pub protocol_oid: Vec<u8>,
    /// Chip key reference, present when the card holds several keys
    pub key_id: Option<u8>,
    /// Curve from the domain parameter info, when standardized
    pub curve: Option<CurveId>,
}

/// Scan the SecurityInfos set in EF.CardAccess for the ECDH Chip
/// Authentication suite and its domain parameters.
pub fn parameters_from_card_access(ef_card_access: &[u8]) -> Result<CaParameters> {
    let set = tlv::parse(ef_card_access)?;
    let infos = tlv::children(&set)?;

    let mut protocol: Option<(Vec<u8>, Option<u8>)> = None;
    let mut curve = None;

    for info in infos {
        let Ok(fields) = tlv::children(info) else {
            continue;
        };
        let Some(oid_field) = fields.first() else {
            continue;
        };
        let Ok(oid) = tlv::primitive(oid_field) else {
            continue;
        };

        // ChipAuthenticationInfo: OID names the full suite; fields are
        // { protocol, version, keyId OPTIONAL }.
        if oid.len() == OID_CA_ECDH.len() + 1 && oid.starts_with(OID_CA_ECDH) {
            let key_id = match fields.get(2) {
                Some(field) => tlv::primitive(field)?.first().copied(),
                None => None,
            };
            protocol = Some((oid.to_vec(), key_id));
        }

        // ChipAuthenticationDomainParameterInfo: OID is the bare key
        // agreement; fields are { protocol, AlgorithmIdentifier, keyId }.
        if oid == OID_CA_ECDH {
            if let Some(identifier) = fields.get(1) {
                let parts = tlv::children(identifier)?;
                let algorithm =
                    tlv::primitive(tlv::expect_child(parts, 0x06, "domain parameter OID")?)?;
                if algorithm == OID_STANDARDIZED_DOMAIN_PARAMETERS {
                    let id = tlv::primitive(tlv::expect_child(
                        parts,
                        0x02,
                        "domain parameter identifier",
                    )?)?;
                    let id = *id
                        .first()
                        .ok_or(Error::ProtocolDataMissing("domain parameter identifier"))?;
                    curve = Some(CurveId::from_standardized_id(id)?);
                }
            }
        }
    }

    let (protocol_oid, key_id) =
        protocol.ok_or(Error::ProtocolDataMissing("chip authentication info"))?;
    Ok(CaParameters { protocol_oid, key_id, curve })
}

/// Run Chip Authentication: read EF.CardSecurity, select the protocol and
/// perform the key agreement. The returned proof material is forwarded to
/// the server unmodified.
#[instrument(skip_all)]
pub fn run<T: CardTransport + ?Sized>(
    transport: &mut T,
    cancel: &CancelToken,
    parameters: &CaParameters,
    ephemeral_public_key: &[u8],
) -> Result<CaResult> {
    let ef_card_security =
        commands::read_file_with_sfi(transport, cancel, EF_CARD_SECURITY_SFI)?;
    commands::set_at_for_chip_authentication(
        transport,
        cancel,
        &parameters.protocol_oid,
        parameters.key_id,
    )?;
    let agreement = commands::general_authenticate(transport, cancel, ephemeral_public_key)?;
    debug!(
        nonce_len = agreement.nonce.len(),
        token_len = agreement.token.len(),
        "chip authentication completed"
    );
    Ok(CaResult {
        ef_card_security,
        nonce: agreement.nonce,
        authentication_token: agreement.token,
    })
}
