//! Messages exchanged with the eID-Server
//!
//! These mirror the two round-trips of the authenticate operation: EAC1
//! carries the certificate material in and the challenge out, EAC2 carries
//! the terminal signature in and the key-agreement proof out. Transport
//! framing (XML/SOAP, TLS) lives outside the engine; these types are the
//! already-decoded field sets.

use bytes::Bytes;
use eac_apdu_core::{status, StatusWord};

use crate::cvc::{CertificateDescription, Chat};

/// First server message: certificates and authorization bounds.
#[derive(Debug, Clone, Default)]
pub struct Eac1Input {
    /// Raw card-verifiable certificates, in no particular order
    pub certificates: Vec<Bytes>,
    /// DER certificate description bound to the terminal certificate
    pub certificate_description: Option<Bytes>,
    /// CHAT the service provider requires (possibly short form)
    pub required_chat: Option<Bytes>,
    /// CHAT the user may narrow down to (possibly short form)
    pub optional_chat: Option<Bytes>,
    /// Authenticated auxiliary data (`67` template), signed over in TA
    pub authenticated_auxiliary_data: Option<Bytes>,
    /// Free-text transaction description for the consent dialog
    pub transaction_info: Option<String>,
    /// Document types the server accepts, e.g. `"ID"`, `"AR"`
    pub accepted_eid_types: Vec<String>,
    /// Server-side transaction time (`YYYY-MM-DD`); the document has no
    /// trusted clock of its own
    pub transaction_time: Option<String>,
}

/// Reply to [`Eac1Input`]: everything the server needs to produce the
/// terminal signature.
#[derive(Debug, Clone)]
pub struct Eac1Output {
    /// Remaining password retry counter, when known from PACE
    pub retry_counter: Option<u8>,
    /// CHAT actually in effect after user narrowing
    pub chat: Vec<u8>,
    /// Current and, if present, previous CAR announced by the card
    pub certification_authority_references: Vec<Vec<u8>>,
    /// Raw EF.CardAccess content
    pub ef_card_access: Vec<u8>,
    /// Card identifier from PACE (IDPICC)
    pub id_picc: Vec<u8>,
    /// Challenge from Get Challenge, consumed by exactly one signature
    pub challenge: [u8; 8],
}

/// Second server message: the ephemeral chip-authentication key the
/// signature is bound to, and the signature itself.
///
/// The server owns the ephemeral key pair; the engine only ever sees the
/// public half. A missing signature instructs the engine to fetch a fresh
/// challenge and answer with [`Eac2Output::Challenge`].
#[derive(Debug, Clone)]
pub struct EacAdditionalInput {
    /// Uncompressed ephemeral public key for Chip Authentication
    pub ephemeral_public_key: Vec<u8>,
    /// Signature over the terminal authentication input
    pub signature: Option<Vec<u8>>,
}

/// Proof material produced by Chip Authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaResult {
    /// Raw EF.CardSecurity content, unmodified
    pub ef_card_security: Vec<u8>,
    /// Card nonce from General Authenticate
    pub nonce: Vec<u8>,
    /// Authentication token over the derived secret
    pub authentication_token: Vec<u8>,
}

/// Reply to [`EacAdditionalInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eac2Output {
    /// A fresh challenge; the server asked for one by omitting the
    /// signature
    Challenge([u8; 8]),
    /// Chip authentication completed
    ChipAuthentication(CaResult),
}

/// One APDU the server asks to be relayed, with the status words it is
/// prepared to accept.
#[derive(Debug, Clone)]
pub struct TransmitApdu {
    /// Raw command APDU
    pub input: Bytes,
    /// Acceptable response status words; empty means `9000` only
    pub acceptable_statuses: Vec<StatusWord>,
}

impl TransmitApdu {
    /// Whether `status` is acceptable for this command.
    pub fn accepts(&self, status: StatusWord) -> bool {
        if self.acceptable_statuses.is_empty() {
            status == status::SUCCESS
        } else {
            self.acceptable_statuses.contains(&status)
        }
    }
}

/// A batch of APDUs to relay in order.
#[derive(Debug, Clone, Default)]
pub struct TransmitRequest {
    /// Commands in transmission order
    pub apdus: Vec<TransmitApdu>,
}

/// Responses collected for one [`TransmitRequest`]. Possibly shorter than
/// the request when a response status was not acceptable.
#[derive(Debug, Clone, Default)]
pub struct TransmitResponse {
    /// Raw response APDUs, status word included
    pub outputs: Vec<Bytes>,
}

/// Final word from the server once it has no further requests.
#[derive(Debug, Clone, Default)]
pub struct ServerDone {
    /// Where to send the user agent next
    pub redirect_url: Option<String>,
}

/// What the server wants next, fetched once per loop iteration.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// Signature material for the second EAC phase
    AdditionalInput(EacAdditionalInput),
    /// Raw APDUs to relay to the card
    Transmit(TransmitRequest),
    /// Session finished
    Done(ServerDone),
}

/// Result handed back to the relying application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResult {
    /// Redirect announced by the server, when any
    pub redirect_url: Option<String>,
}

/// What PACE established before this engine starts.
#[derive(Debug, Clone, Default)]
pub struct PaceOutcome {
    /// Raw EF.CardAccess read during PACE
    pub ef_card_access: Vec<u8>,
    /// Card identifier (IDPICC)
    pub id_picc: Vec<u8>,
    /// Most recent CAR announced by the card
    pub car_current: Option<Vec<u8>>,
    /// Previous CAR, when the card is in a chain rollover
    pub car_previous: Option<Vec<u8>>,
    /// Remaining password retry counter
    pub retry_counter: Option<u8>,
}

/// Data shown to the user for consent and CHAT narrowing.
#[derive(Debug, Clone)]
pub struct EacUiData {
    /// Parsed certificate description
    pub description: CertificateDescription,
    /// Minimum access the service insists on
    pub required_chat: Chat,
    /// Maximum access the user may grant
    pub optional_chat: Chat,
    /// Transaction info text, when supplied
    pub transaction_info: Option<String>,
    /// Accepted document types
    pub accepted_eid_types: Vec<String>,
}
