//! The authentication flow from activation to final result
//!
//! Sequencing: consent first (no card traffic before the user agrees),
//! then document acquisition and PACE, then the two orchestrator phases,
//! then the server-driven transmit loop. Teardown runs on every exit
//! path, and the server is told about client-side failures so it can
//! close its session.

use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::cvc::CertificateDate;
use crate::error::{Error, Result};
use crate::messages::{AuthenticationResult, Eac1Input, Eac2Output, ServerMessage};
use crate::orchestrator::{Orchestrator, ProtocolState};

use super::{
    relay, ActivationGuard, ConsentHandler, DocumentProvider, EidServer, PacePinId, PaceProvider,
};

/// How many fresh challenges the server may request before the attempt is
/// treated as a non-conforming server.
const MAX_CHALLENGE_RETRIES: usize = 3;

/// The outer driver owning one authentication attempt end to end.
pub struct AuthenticationDriver<'a> {
    /// Document and terminal selection
    pub documents: &'a mut dyn DocumentProvider,
    /// PACE establishment and teardown
    pub pace: &'a mut dyn PaceProvider,
    /// Consent and CHAT narrowing dialog
    pub consent: &'a mut dyn ConsentHandler,
    /// Channel to the eID-Server
    pub server: &'a mut dyn EidServer,
}

impl core::fmt::Debug for AuthenticationDriver<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthenticationDriver").finish_non_exhaustive()
    }
}

impl AuthenticationDriver<'_> {
    /// Run one authentication attempt.
    ///
    /// Holds the global activation slot for the duration; a concurrent
    /// second activation fails with [`Error::AlreadyRunning`] without
    /// touching any card.
    #[instrument(skip_all)]
    pub fn authenticate(
        &mut self,
        input: &Eac1Input,
        pin: PacePinId,
        cancel: CancelToken,
        now: CertificateDate,
    ) -> Result<AuthenticationResult> {
        let _slot = ActivationGuard::acquire()?;
        let result = self.run(input, pin, &cancel, now);
        if let Err(error) = &result {
            if !matches!(error, Error::UserCancelled) {
                warn!(%error, "authentication attempt failed");
            }
            self.server.report_error(error);
        }
        result
    }

    fn run(
        &mut self,
        input: &Eac1Input,
        pin: PacePinId,
        cancel: &CancelToken,
        now: CertificateDate,
    ) -> Result<AuthenticationResult> {
        // A server-supplied transaction time wins over the local clock;
        // the document itself has neither.
        let now = match &input.transaction_time {
            Some(text) => CertificateDate::from_iso8601(text)?,
            None => now,
        };

        // Consent happens before any card is touched.
        let (_, ui) = Orchestrator::prepare_ui(input)?;
        let selected_chat = self.consent.request_consent(&ui)?;
        cancel.checkpoint()?;

        let (mut session, disposition) =
            self.documents.acquire(&ui.accepted_eid_types, cancel)?;
        debug!(?disposition, document = session.document_type(), "document acquired");
        if !ui.accepted_eid_types.is_empty()
            && !ui
                .accepted_eid_types
                .iter()
                .any(|accepted| accepted == session.document_type())
        {
            let kind = session.document_type().to_owned();
            session.release();
            return Err(Error::DocumentUnsupported(kind));
        }

        let outcome = self.run_on_session(
            session.as_mut(),
            input,
            pin,
            cancel,
            now,
            selected_chat,
        );
        // Teardown runs regardless of how the protocol ended; a cancelled
        // or failed attempt must not leave channel state behind. An
        // abnormal end additionally resets the card so it is never left
        // mid-protocol.
        if outcome.is_err() {
            let _ = session.transport().reset();
        }
        self.pace.teardown(session.as_mut());
        session.release();
        outcome
    }

    fn run_on_session(
        &mut self,
        session: &mut dyn super::CardSession,
        input: &Eac1Input,
        pin: PacePinId,
        cancel: &CancelToken,
        now: CertificateDate,
        selected_chat: Option<crate::cvc::Chat>,
    ) -> Result<AuthenticationResult> {
        let chat_bytes = selected_chat.map(|chat| chat.to_bytes());
        let pace_outcome = self.pace.establish(session, pin, chat_bytes.as_deref())?;

        let mut orchestrator = Orchestrator::new(cancel.clone(), now);
        let eac1 = orchestrator.process(session.transport(), input, &pace_outcome, selected_chat)?;
        let additional = self.server.send_eac1(&eac1)?;

        let mut next = ServerMessage::AdditionalInput(additional);
        let mut challenge_retries = 0;
        loop {
            cancel.checkpoint()?;
            next = match next {
                ServerMessage::AdditionalInput(additional) => {
                    let eac2 =
                        orchestrator.process_additional(session.transport(), &additional)?;
                    if matches!(eac2, Eac2Output::Challenge(_)) {
                        challenge_retries += 1;
                        if challenge_retries > MAX_CHALLENGE_RETRIES {
                            return Err(Error::InvalidServerData(
                                "server kept requesting fresh challenges".into(),
                            ));
                        }
                    }
                    self.server.send_eac2(&eac2)?
                }
                ServerMessage::Transmit(request) => {
                    if orchestrator.state() != ProtocolState::Complete {
                        return Err(Error::InvalidServerData(
                            "transmit requested before chip authentication finished".into(),
                        ));
                    }
                    let response = relay(session.transport(), cancel, &request)?;
                    self.server.send_transmit(&response)?
                }
                ServerMessage::Done(done) => {
                    info!("authentication finished");
                    return Ok(AuthenticationResult {
                        redirect_url: done.redirect_url,
                    });
                }
            };
        }
    }
}
