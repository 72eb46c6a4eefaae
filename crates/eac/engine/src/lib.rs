//! Terminal-side Extended Access Control (EAC v2, TR-03110)
//!
//! The engine drives the card-side protocol for online authentication
//! with an electronic identity document: verification and loading of the
//! card-verifiable certificate chain, Terminal Authentication against a
//! remote signer, Chip Authentication, and the surrounding activation
//! flow that relays APDUs on behalf of the eID-Server.
//!
//! The terminal's private signing key and the derived session keys never
//! exist inside this crate: signatures come from the eID-Server, and the
//! key-agreement proof material is relayed for the server to validate.
//! PACE and the network framing towards the server are collaborators
//! behind traits in [`driver`].
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod ca;
pub mod cancel;
pub mod commands;
pub mod crypto;
pub mod cvc;
pub mod driver;
pub mod error;
pub mod messages;
pub mod orchestrator;
pub mod session;
pub mod ta;

mod tlv;

pub use cancel::CancelToken;
pub use cvc::{
    CardVerifiableCertificate, CertificateDate, CertificateDescription, Chat, CvcChain,
};
pub use driver::{
    AuthenticationDriver, CardDisposition, CardSession, ConsentHandler, DocumentProvider,
    EidServer, PacePinId, PaceProvider,
};
pub use error::{Error, Result};
pub use messages::{
    AuthenticationResult, CaResult, Eac1Input, Eac1Output, Eac2Output, EacAdditionalInput,
    EacUiData, PaceOutcome, ServerDone, ServerMessage, TransmitApdu, TransmitRequest,
    TransmitResponse,
};
pub use orchestrator::{Orchestrator, ProtocolState};
pub use session::SessionKeyMaterial;

// The APDU layer types most callers need when implementing a transport.
pub use eac_apdu_core::{CardTransport, Command, Response, StatusWord, TransportError};
