//! Outer authentication driver
//!
//! Everything around the orchestrator: document and terminal selection,
//! PACE establishment, user consent, the eID-Server message loop and the
//! single global activation slot. The collaborators are injected as trait
//! objects so the whole flow runs against synthetic cards and servers.

use std::sync::atomic::{AtomicBool, Ordering};

use eac_apdu_core::CardTransport;

use crate::cancel::CancelToken;
use crate::cvc::Chat;
use crate::error::{Error, Result};
use crate::messages::{
    Eac1Output, Eac2Output, EacAdditionalInput, EacUiData, PaceOutcome, ServerMessage,
    TransmitResponse,
};

mod eid_server_step;
mod ui_step;

pub use eid_server_step::relay;
pub use ui_step::AuthenticationDriver;

/// PACE password the user authenticates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacePinId {
    /// Machine readable zone (passports)
    Mrz,
    /// Card access number printed on the document
    Can,
    /// The eID PIN
    Pin,
    /// Unblocking key
    Puk,
}

/// How the document entered the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardDisposition {
    /// Already connected and recognized when the attempt started
    Present,
    /// Inserted after a bounded wait
    Inserted,
}

/// An exclusively owned channel to a recognized identity document.
///
/// The transport must not be shared; the attempt owns it for its entire
/// duration.
pub trait CardSession {
    /// Card channel of this session.
    fn transport(&mut self) -> &mut dyn CardTransport;

    /// Recognized document type, e.g. `"ID"`.
    fn document_type(&self) -> &str;

    /// Release the document, ending exclusive ownership.
    fn release(&mut self);
}

/// Terminal and document selection, injected as a capability so the
/// engine never hard-wires a recognition stack.
pub trait DocumentProvider {
    /// Produce a session for a suitable document, waiting (boundedly) for
    /// one to be inserted if none is present. Fails with
    /// [`Error::DocumentTimeout`] when the wait expires and
    /// [`Error::DocumentUnsupported`] when only unacceptable documents
    /// turn up.
    fn acquire(
        &mut self,
        accepted_types: &[String],
        cancel: &CancelToken,
    ) -> Result<(Box<dyn CardSession>, CardDisposition)>;
}

/// PACE password establishment, performed before this engine starts.
pub trait PaceProvider {
    /// Run PACE with the given password on the session's channel.
    fn establish(
        &mut self,
        session: &mut dyn CardSession,
        pin: PacePinId,
        chat: Option<&[u8]>,
    ) -> Result<PaceOutcome>;

    /// Tear down the PACE channel state. Called on every exit path; after
    /// successful chip authentication the card traffic has already moved
    /// to the new channel.
    fn teardown(&mut self, session: &mut dyn CardSession);
}

/// Consent dialog: present the attempt's data and let the user narrow the
/// authorization.
pub trait ConsentHandler {
    /// Returns the narrowed CHAT, or `None` to grant the full optional
    /// CHAT. A user abort surfaces as [`Error::UserCancelled`].
    fn request_consent(&mut self, ui: &EacUiData) -> Result<Option<Chat>>;
}

/// The channel to the eID-Server. Message framing lives behind this
/// trait; failures surface as [`Error::ServerCommunication`].
pub trait EidServer {
    /// Deliver the first-phase output, receiving the signature material.
    fn send_eac1(&mut self, output: &Eac1Output) -> Result<EacAdditionalInput>;

    /// Deliver the second-phase output, receiving the next instruction.
    fn send_eac2(&mut self, output: &Eac2Output) -> Result<ServerMessage>;

    /// Deliver relayed APDU responses, receiving the next instruction.
    fn send_transmit(&mut self, response: &TransmitResponse) -> Result<ServerMessage>;

    /// Tell the server the attempt ended abnormally on the client side.
    fn report_error(&mut self, error: &Error);
}

/// The system-wide activation slot. Only one authentication attempt may
/// run at a time; a second activation fails fast instead of queueing.
static ACTIVATION_SLOT: AtomicBool = AtomicBool::new(false);

/// RAII hold on the activation slot.
#[derive(Debug)]
pub(crate) struct ActivationGuard(());

impl ActivationGuard {
    pub(crate) fn acquire() -> Result<Self> {
        ACTIVATION_SLOT
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(()))
            .map_err(|_| Error::AlreadyRunning)
    }
}

impl Drop for ActivationGuard {
    fn drop(&mut self) {
        ACTIVATION_SLOT.store(false, Ordering::Release);
    }
}
