//! Error taxonomy of the EAC engine
//!
//! Low-level card and cryptographic failures are translated into these
//! kinds at the point they cross into the engine. The orchestrator and the
//! outer driver only ever map these declared kinds into caller-facing
//! results; anything else propagates, since masking an unknown failure
//! could leave the card in an ambiguous trust state.

use eac_apdu_core::{StatusWord, TransportError};

/// Result type for EAC operations
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Error type for EAC operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The certificate set cannot be ordered into a single trust chain.
    #[error("certificate set does not form a chain: {0}")]
    ChainMalformed(&'static str),

    /// A certificate signature did not verify against its issuer key.
    #[error("certificate signature verification failed")]
    SignatureInvalid,

    /// A certificate's expiration date lies before the transaction time.
    #[error("certificate has expired")]
    CertificateExpired,

    /// A certificate's effective date lies after the transaction time.
    #[error("certificate is not yet valid")]
    CertificateNotYetValid,

    /// The certificate description does not hash to the value bound in the
    /// terminal certificate.
    #[error("certificate description does not match the referenced hash")]
    DescriptionMismatch,

    /// The card answered a protocol step with an error status word.
    #[error("card reported status {status} during {operation}")]
    CardSecurity {
        /// Protocol step that was being executed
        operation: &'static str,
        /// Status word returned by the card
        status: StatusWord,
    },

    /// A structurally required field was absent from a card response.
    #[error("required protocol data missing: {0}")]
    ProtocolDataMissing(&'static str),

    /// The round-trip to the eID-Server failed.
    #[error("communication with the eID-Server failed: {0}")]
    ServerCommunication(String),

    /// The eID-Server sent something the protocol does not allow here.
    #[error("invalid data received from the eID-Server: {0}")]
    InvalidServerData(String),

    /// The user (or the system on the user's behalf) cancelled the attempt.
    #[error("authentication attempt was cancelled")]
    UserCancelled,

    /// A second activation was requested while one attempt is in flight.
    #[error("another authentication attempt is already running")]
    AlreadyRunning,

    /// No suitable document was presented within the wait period.
    #[error("no matching document was presented in time")]
    DocumentTimeout,

    /// The connected card is not of the expected document type.
    #[error("connected document of type {0:?} is unsupported")]
    DocumentUnsupported(String),

    /// The user-narrowed CHAT lies outside the required/optional bounds.
    #[error("selected CHAT is outside the permitted bounds")]
    ChatNotPermitted,

    /// Algorithm or domain parameters this engine cannot handle.
    #[error("unsupported algorithm or domain parameters: {0}")]
    UnsupportedAlgorithm(String),

    /// A TLV structure could not be parsed.
    #[error("malformed TLV structure: {0}")]
    Tlv(iso7816_tlv::TlvError),

    /// The underlying card channel failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An operation was invoked in a protocol state that does not allow it.
    #[error("operation not allowed in the current protocol state: {0}")]
    InvalidState(&'static str),
}

impl From<iso7816_tlv::TlvError> for Error {
    fn from(error: iso7816_tlv::TlvError) -> Self {
        Self::Tlv(error)
    }
}

impl Error {
    /// Whether the user can sensibly retry the overall flow after this
    /// error (wrong PIN class of card statuses, or an explicit cancel), as
    /// opposed to a fatal protocol or trust failure.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::UserCancelled => true,
            Self::CardSecurity { status, .. } => status.is_warning(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eac_apdu_core::status;

    #[test]
    fn recoverability_classification() {
        assert!(Error::UserCancelled.is_recoverable());
        assert!(
            Error::CardSecurity {
                operation: "external authenticate",
                status: StatusWord::new(0x63, 0xC2),
            }
            .is_recoverable()
        );
        assert!(
            !Error::CardSecurity {
                operation: "verify certificate",
                status: status::SECURITY_STATUS_NOT_SATISFIED,
            }
            .is_recoverable()
        );
        assert!(!Error::SignatureInvalid.is_recoverable());
    }
}
