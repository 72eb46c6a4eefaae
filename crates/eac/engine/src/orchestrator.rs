//! Two-phase EAC orchestration
//!
//! Mirrors the two round-trips of the authenticate operation. `process`
//! consumes the first server message, validates and loads the certificate
//! chain and fetches the challenge; `process_additional` consumes the
//! server's signature, finishes Terminal Authentication and runs Chip
//! Authentication. Every failure drives the state machine into a terminal
//! state so a partially authenticated card is never reported as success.

use eac_apdu_core::CardTransport;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::ca::{self, CaParameters};
use crate::cancel::CancelToken;
use crate::crypto;
use crate::cvc::{chat, CertificateDate, CertificateDescription, Chat, CvcChain};
use crate::error::{Error, Result};
use crate::messages::{
    Eac1Input, Eac1Output, Eac2Output, EacAdditionalInput, EacUiData, PaceOutcome,
};
use crate::session::SessionKeyMaterial;
use crate::ta;

/// Protocol progress of one authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Nothing has happened yet; the certificate chain is unverified
    AwaitingChainVerification,
    /// Chain loaded and challenge issued; waiting for the signature
    AwaitingServerSignature,
    /// Signature accepted; key agreement with the chip is running
    AwaitingChipAuthentication,
    /// Chip authentication finished
    Complete,
    /// The attempt was cancelled
    Cancelled,
    /// A protocol or trust error occurred
    Failed,
}

impl ProtocolState {
    /// Whether no further protocol calls are allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled | Self::Failed)
    }
}

/// Driver of the card-side EAC steps for one attempt.
pub struct Orchestrator {
    state: ProtocolState,
    cancel: CancelToken,
    now: CertificateDate,
    chain: Option<CvcChain>,
    ca_parameters: Option<CaParameters>,
    session: SessionKeyMaterial,
}

impl core::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// New attempt. `now` is the transaction time certificates are
    /// checked against; the document itself has no trusted clock.
    pub fn new(cancel: CancelToken, now: CertificateDate) -> Self {
        Self {
            state: ProtocolState::AwaitingChainVerification,
            cancel,
            now,
            chain: None,
            ca_parameters: None,
            session: SessionKeyMaterial::default(),
        }
    }

    /// Current protocol state.
    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Cancellation token shared with the UI.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Record a cancellation observed between protocol calls.
    pub fn mark_cancelled(&mut self) {
        if !self.state.is_terminal() {
            self.state = ProtocolState::Cancelled;
        }
    }

    /// Static validation of the first server message: order the chain,
    /// check the description binding and derive the consent data. No card
    /// traffic; safe to run before a document is even present.
    pub fn prepare_ui(input: &Eac1Input) -> Result<(CvcChain, EacUiData)> {
        let mut certificates = Vec::with_capacity(input.certificates.len());
        for raw in &input.certificates {
            certificates.push(crate::cvc::CardVerifiableCertificate::from_bytes(raw)?);
        }
        let chain = CvcChain::build(certificates)?;

        let description_bytes = input
            .certificate_description
            .as_ref()
            .ok_or_else(|| Error::InvalidServerData("certificate description missing".into()))?;
        let description = CertificateDescription::from_bytes(description_bytes)?;
        if let Some(expected) = chain.leaf().description_hash() {
            let algorithm = chain.leaf().public_key().algorithm()?;
            if description.hash(algorithm) != expected {
                return Err(Error::DescriptionMismatch);
            }
        }

        let parse_chat = |raw: &Option<bytes::Bytes>| -> Result<Option<Chat>> {
            match raw {
                Some(bytes) => Ok(Some(Chat::from_bytes(&chat::repair_short_form(bytes))?)),
                None => Ok(None),
            }
        };
        let optional_chat = parse_chat(&input.optional_chat)?.unwrap_or(*chain.chat());
        let required_chat =
            parse_chat(&input.required_chat)?.unwrap_or_else(|| optional_chat.cleared());
        if !required_chat.is_subset_of(&optional_chat)
            || !optional_chat.is_subset_of(chain.chat())
        {
            return Err(Error::ChatNotPermitted);
        }

        let ui = EacUiData {
            description,
            required_chat,
            optional_chat,
            transaction_info: input.transaction_info.clone(),
            accepted_eid_types: input.accepted_eid_types.clone(),
        };
        Ok((chain, ui))
    }

    /// First phase: chain verification (locally and on the card) and the
    /// challenge for the external signer.
    ///
    /// `selected_chat` is the user's narrowed authorization; it must lie
    /// between the required and optional CHAT. `None` grants the full
    /// optional CHAT.
    pub fn process<T: CardTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        input: &Eac1Input,
        pace: &PaceOutcome,
        selected_chat: Option<Chat>,
    ) -> Result<Eac1Output> {
        let result = self.process_inner(transport, input, pace, selected_chat);
        self.seal(result)
    }

    fn process_inner<T: CardTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        input: &Eac1Input,
        pace: &PaceOutcome,
        selected_chat: Option<Chat>,
    ) -> Result<Eac1Output> {
        if self.state != ProtocolState::AwaitingChainVerification {
            return Err(Error::InvalidState("first phase already ran"));
        }
        self.cancel.checkpoint()?;

        let (chain, ui) = Self::prepare_ui(input)?;
        let selected = match selected_chat {
            Some(chat) => {
                if !ui.required_chat.is_subset_of(&chat) || !chat.is_subset_of(&ui.optional_chat)
                {
                    return Err(Error::ChatNotPermitted);
                }
                chat
            }
            None => ui.optional_chat,
        };

        let ca_parameters = ca::parameters_from_card_access(&pace.ef_card_access)?;
        chain.verify(self.now, Some(&ui.description), ca_parameters.curve)?;
        info!(leaf = %chain.leaf().chr(), "certificate chain verified");

        ta::load_chain(transport, &self.cancel, &chain)?;
        let challenge = ta::request_challenge(transport, &self.cancel)?;

        let mut authority_references = Vec::new();
        match &pace.car_current {
            Some(car) => authority_references.push(car.clone()),
            None => authority_references.push(chain.anchor().chr().as_bytes().to_vec()),
        }
        if let Some(previous) = &pace.car_previous {
            authority_references.push(previous.clone());
        }

        self.session.challenge = challenge.to_vec();
        self.session.ef_card_access = pace.ef_card_access.clone();
        if let Some(auxiliary) = &input.authenticated_auxiliary_data {
            self.session.auxiliary_data = auxiliary.to_vec();
        }
        self.chain = Some(chain);
        self.ca_parameters = Some(ca_parameters);
        self.state = ProtocolState::AwaitingServerSignature;

        Ok(Eac1Output {
            retry_counter: pace.retry_counter,
            chat: selected.to_bytes(),
            certification_authority_references: authority_references,
            ef_card_access: pace.ef_card_access.clone(),
            id_picc: pace.id_picc.clone(),
            challenge,
        })
    }

    /// Second phase: finish Terminal Authentication with the server's
    /// signature and run Chip Authentication.
    ///
    /// When the server omits the signature it wants a fresh challenge;
    /// the state stays at [`ProtocolState::AwaitingServerSignature`] and
    /// the reply carries the new challenge.
    pub fn process_additional<T: CardTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        input: &EacAdditionalInput,
    ) -> Result<Eac2Output> {
        let result = self.process_additional_inner(transport, input);
        self.seal(result)
    }

    fn process_additional_inner<T: CardTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        input: &EacAdditionalInput,
    ) -> Result<Eac2Output> {
        if self.state != ProtocolState::AwaitingServerSignature {
            return Err(Error::InvalidState("no signature is awaited"));
        }
        self.cancel.checkpoint()?;

        let signature = match &input.signature {
            Some(signature) => signature,
            None => {
                warn!("server requested a fresh challenge");
                let challenge = ta::request_challenge(transport, &self.cancel)?;
                self.session.challenge = challenge.to_vec();
                return Ok(Eac2Output::Challenge(challenge));
            }
        };

        let compressed = crypto::compress_public_point(&input.ephemeral_public_key)?;
        let (protocol_oid, terminal_chr) = {
            let leaf = self
                .chain
                .as_ref()
                .ok_or(Error::InvalidState("no verified chain"))?
                .leaf();
            (leaf.public_key().oid.clone(), leaf.chr().clone())
        };
        let auxiliary = (!self.session.auxiliary_data.is_empty())
            .then_some(self.session.auxiliary_data.clone());

        ta::authenticate(
            transport,
            &self.cancel,
            &protocol_oid,
            &terminal_chr,
            &compressed,
            auxiliary.as_deref(),
            signature,
        )?;
        // The challenge is consumed; a retry needs a fresh one.
        self.session.challenge.zeroize();
        self.session.ephemeral_public_key = input.ephemeral_public_key.clone();
        self.session.compressed_ephemeral_key = compressed;
        self.state = ProtocolState::AwaitingChipAuthentication;

        let parameters = self
            .ca_parameters
            .clone()
            .ok_or(Error::InvalidState("no chip authentication parameters"))?;
        let result = ca::run(
            transport,
            &self.cancel,
            &parameters,
            &self.session.ephemeral_public_key,
        )?;
        self.session.ef_card_security = result.ef_card_security.clone();
        self.session.nonce = result.nonce.clone();
        self.session.authentication_token = result.authentication_token.clone();

        self.state = ProtocolState::Complete;
        debug!("authentication protocol complete");
        Ok(Eac2Output::ChipAuthentication(result))
    }

    fn seal<R>(&mut self, result: Result<R>) -> Result<R> {
        match &result {
            Ok(_) => {}
            Err(Error::UserCancelled) => self.state = ProtocolState::Cancelled,
            Err(error) => {
                warn!(%error, "authentication attempt failed");
                self.state = ProtocolState::Failed;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use eac_apdu_core::mock::MockTransport;
    use eac_apdu_core::status;
    use p256::ecdsa::SigningKey;
    use rand_v8::rngs::OsRng;

    use crate::ca::testutil::ef_card_access;
    use crate::cvc::testutil::{build_cert, description_bytes, CertSpec};
    use crate::tlv;

    use super::*;

    struct Fixture {
        input: Eac1Input,
        pace: PaceOutcome,
        chain_chunks: usize,
    }

    fn date(year: u16, month: u8, day: u8) -> CertificateDate {
        CertificateDate::new(year, month, day).unwrap()
    }

    fn fixture() -> Fixture {
        let root_key = SigningKey::random(&mut OsRng);
        let dv_key = SigningKey::random(&mut OsRng);
        let terminal_key = SigningKey::random(&mut OsRng);
        let description = description_bytes("Example Service");
        let description_hash = crate::crypto::TaAlgorithm::EcdsaSha256.digest(&description);

        let root = build_cert(&CertSpec {
            car: "DETESTCVCA001",
            chr: "DETESTCVCA001",
            role: 0xC0,
            subject: root_key.verifying_key(),
            signer: &root_key,
            with_domain_params: true,
            description_hash: None,
            effective: date(2025, 1, 1),
            expiration: date(2030, 1, 1),
        });
        let dv = build_cert(&CertSpec {
            car: "DETESTCVCA001",
            chr: "DETESTDV00001",
            role: 0x80,
            subject: dv_key.verifying_key(),
            signer: &root_key,
            with_domain_params: false,
            description_hash: None,
            effective: date(2026, 1, 1),
            expiration: date(2027, 1, 1),
        });
        let terminal = build_cert(&CertSpec {
            car: "DETESTDV00001",
            chr: "DETESTTERM001",
            role: 0x00,
            subject: terminal_key.verifying_key(),
            signer: &dv_key,
            with_domain_params: false,
            description_hash: Some(description_hash),
            effective: date(2026, 8, 1),
            expiration: date(2026, 9, 1),
        });

        // Commands needed to load DV and terminal onto the card.
        let chain_chunks = [&dv, &terminal]
            .iter()
            .map(|cert| {
                let parsed =
                    crate::cvc::CardVerifiableCertificate::from_bytes(cert).unwrap();
                1 + parsed.body_and_signature().len().div_ceil(255)
            })
            .sum();

        let input = Eac1Input {
            certificates: vec![
                Bytes::from(terminal),
                Bytes::from(root),
                Bytes::from(dv),
            ],
            certificate_description: Some(Bytes::from(description)),
            required_chat: None,
            optional_chat: None,
            authenticated_auxiliary_data: None,
            transaction_info: Some("Test transaction".into()),
            accepted_eid_types: vec!["ID".into()],
            transaction_time: Some("2026-08-23".into()),
        };
        let pace = PaceOutcome {
            ef_card_access: ef_card_access(None),
            id_picc: vec![0x5A; 16],
            car_current: None,
            car_previous: None,
            retry_counter: Some(3),
        };
        Fixture { input, pace, chain_chunks }
    }

    fn script_phase_one(card: &mut MockTransport, chunks: usize) {
        for _ in 0..chunks {
            card.push_success(&[]);
        }
        card.push_success(&[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
    }

    fn script_phase_two(card: &mut MockTransport) {
        // MSE:Set AT, External Authenticate
        card.push_success(&[]);
        card.push_success(&[]);
        // EF.CardSecurity, MSE:Set AT for CA, General Authenticate
        card.push_success(&[0x30, 0x00]);
        card.push_success(&[]);
        let mut dynamic = tlv::encode(&[0x81], &[0xAA; 8]);
        dynamic.extend_from_slice(&tlv::encode(&[0x82], &[0xBB; 8]));
        card.push_success(&tlv::encode(&[0x7C], &dynamic));
    }

    #[test]
    fn two_phases_reach_complete() {
        let f = fixture();
        let mut card = MockTransport::new();
        script_phase_one(&mut card, f.chain_chunks);
        script_phase_two(&mut card);

        let mut orchestrator =
            Orchestrator::new(CancelToken::new(), date(2026, 8, 23));
        let eac1 = orchestrator
            .process(&mut card, &f.input, &f.pace, None)
            .unwrap();
        assert_eq!(orchestrator.state(), ProtocolState::AwaitingServerSignature);
        assert_eq!(eac1.challenge, [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]);
        assert_eq!(eac1.retry_counter, Some(3));
        assert_eq!(
            eac1.certification_authority_references,
            vec![b"DETESTCVCA001".to_vec()]
        );

        let additional = EacAdditionalInput {
            ephemeral_public_key: {
                let mut point = vec![0x04];
                point.extend_from_slice(&[0x01; 64]);
                point
            },
            signature: Some(vec![0x5A; 64]),
        };
        let eac2 = orchestrator
            .process_additional(&mut card, &additional)
            .unwrap();
        assert_eq!(orchestrator.state(), ProtocolState::Complete);
        match eac2 {
            Eac2Output::ChipAuthentication(result) => {
                assert_eq!(result.nonce, vec![0xAA; 8]);
                assert_eq!(result.authentication_token, vec![0xBB; 8]);
                assert_eq!(result.ef_card_security, vec![0x30, 0x00]);
            }
            Eac2Output::Challenge(_) => panic!("expected a chip authentication result"),
        }
    }

    #[test]
    fn missing_signature_returns_a_fresh_challenge() {
        let f = fixture();
        let mut card = MockTransport::new();
        script_phase_one(&mut card, f.chain_chunks);
        card.push_success(&[0x88; 8]);

        let mut orchestrator =
            Orchestrator::new(CancelToken::new(), date(2026, 8, 23));
        orchestrator
            .process(&mut card, &f.input, &f.pace, None)
            .unwrap();

        let retry = EacAdditionalInput {
            ephemeral_public_key: vec![],
            signature: None,
        };
        let eac2 = orchestrator
            .process_additional(&mut card, &retry)
            .unwrap();
        assert_eq!(eac2, Eac2Output::Challenge([0x88; 8]));
        assert_eq!(orchestrator.state(), ProtocolState::AwaitingServerSignature);
    }

    #[test]
    fn card_rejection_fails_the_attempt() {
        let f = fixture();
        let mut card = MockTransport::new();
        card.push_status(status::SECURITY_STATUS_NOT_SATISFIED);

        let mut orchestrator =
            Orchestrator::new(CancelToken::new(), date(2026, 8, 23));
        let err = orchestrator
            .process(&mut card, &f.input, &f.pace, None)
            .unwrap_err();
        assert!(matches!(err, Error::CardSecurity { .. }));
        assert_eq!(orchestrator.state(), ProtocolState::Failed);

        // Terminal state: further calls are rejected.
        assert!(matches!(
            orchestrator.process(&mut card, &f.input, &f.pace, None),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn cancellation_reaches_cancelled_not_complete() {
        let f = fixture();
        let mut card = MockTransport::new();
        script_phase_one(&mut card, f.chain_chunks);

        let cancel = CancelToken::new();
        let mut orchestrator = Orchestrator::new(cancel.clone(), date(2026, 8, 23));
        orchestrator
            .process(&mut card, &f.input, &f.pace, None)
            .unwrap();

        cancel.cancel();
        let err = orchestrator
            .process_additional(
                &mut card,
                &EacAdditionalInput {
                    ephemeral_public_key: vec![0x04; 65],
                    signature: Some(vec![0x5A; 64]),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::UserCancelled));
        assert_eq!(orchestrator.state(), ProtocolState::Cancelled);
    }

    #[test]
    fn narrowed_chat_must_respect_the_bounds() {
        let f = fixture();
        let (_, ui) = Orchestrator::prepare_ui(&f.input).unwrap();
        let outside = ui
            .optional_chat
            .with_special(crate::cvc::SpecialFunction::PrivilegedTerminal, true);

        let mut card = MockTransport::new();
        let mut orchestrator =
            Orchestrator::new(CancelToken::new(), date(2026, 8, 23));
        let err = orchestrator
            .process(&mut card, &f.input, &f.pace, Some(outside))
            .unwrap_err();
        assert!(matches!(err, Error::ChatNotPermitted));
    }

    #[test]
    fn tampered_description_is_rejected_before_card_traffic() {
        let mut f = fixture();
        f.input.certificate_description =
            Some(Bytes::from(description_bytes("Impostor Service")));

        let mut card = MockTransport::new();
        let mut orchestrator =
            Orchestrator::new(CancelToken::new(), date(2026, 8, 23));
        let err = orchestrator
            .process(&mut card, &f.input, &f.pace, None)
            .unwrap_err();
        assert!(matches!(err, Error::DescriptionMismatch));
        assert!(card.sent().is_empty());
    }
}
