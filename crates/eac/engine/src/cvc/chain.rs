//! Ordering and verification of certificate chains
//!
//! The eID-Server hands over an unordered certificate set. It must order
//! into exactly one chain from a trust anchor down to a single terminal
//! certificate; anything else is rejected before any certificate is
//! loaded onto the card.

use tracing::{debug, trace};

use crate::crypto::CurveId;
use crate::error::{Error, Result};

use super::{CardVerifiableCertificate, CertificateDate, CertificateDescription, Chat, Role};

/// A validated certificate chain, ordered trust anchor first.
///
/// The anchor may be a self-signed CVCA certificate or, when the relying
/// server trusts the CVCA out of band, the document verifier certificate
/// itself. The last element is always the terminal certificate.
#[derive(Debug, Clone)]
pub struct CvcChain {
    certs: Vec<CardVerifiableCertificate>,
}

impl CvcChain {
    /// Order an unordered certificate set into a chain.
    ///
    /// Fails with [`Error::ChainMalformed`] when the set is empty, has no
    /// unique terminal certificate, contains duplicate holder references,
    /// or contains certificates that do not belong to the chain.
    pub fn build(certs: Vec<CardVerifiableCertificate>) -> Result<Self> {
        if certs.is_empty() {
            return Err(Error::ChainMalformed("empty certificate set"));
        }

        let mut remaining = certs;
        let leaf_count = remaining
            .iter()
            .filter(|cert| cert.chat().role() == Role::Terminal)
            .count();
        if leaf_count != 1 {
            return Err(Error::ChainMalformed(
                "certificate set must contain exactly one terminal certificate",
            ));
        }
        let leaf_index = remaining
            .iter()
            .position(|cert| cert.chat().role() == Role::Terminal)
            .ok_or(Error::ChainMalformed("no terminal certificate"))?;

        let mut chain = vec![remaining.swap_remove(leaf_index)];
        loop {
            let current = &chain[chain.len() - 1];
            if current.is_self_signed() {
                break;
            }
            let wanted = current.car().clone();
            let mut issuers = remaining
                .iter()
                .enumerate()
                .filter(|(_, cert)| *cert.chr() == wanted)
                .map(|(index, _)| index);
            let index = match (issuers.next(), issuers.next()) {
                (None, _) => break,
                (Some(index), None) => index,
                (Some(_), Some(_)) => {
                    return Err(Error::ChainMalformed(
                        "duplicate holder reference among issuers",
                    ))
                }
            };
            chain.push(remaining.swap_remove(index));
        }

        if !remaining.is_empty() {
            return Err(Error::ChainMalformed(
                "certificate set contains certificates outside the chain",
            ));
        }

        chain.reverse();
        debug!(
            length = chain.len(),
            anchor = %chain[0].chr(),
            leaf = %chain[chain.len() - 1].chr(),
            "certificate chain ordered"
        );
        Ok(Self { certs: chain })
    }

    /// Certificates in order, trust anchor first.
    pub fn certificates(&self) -> &[CardVerifiableCertificate] {
        &self.certs
    }

    /// The trust anchor (first certificate).
    pub fn anchor(&self) -> &CardVerifiableCertificate {
        &self.certs[0]
    }

    /// The terminal certificate (last certificate).
    pub fn leaf(&self) -> &CardVerifiableCertificate {
        &self.certs[self.certs.len() - 1]
    }

    /// Authorization template of the terminal certificate.
    pub fn chat(&self) -> &Chat {
        self.leaf().chat()
    }

    /// Certificates to be loaded onto the card, in loading order. A
    /// self-signed anchor is skipped; the card already holds that key.
    pub fn card_certificates(&self) -> impl Iterator<Item = &CardVerifiableCertificate> {
        self.certs.iter().skip_while(|cert| cert.is_self_signed())
    }

    /// Curve the chain's keys live on: explicit domain parameters of the
    /// anchor when present, otherwise the caller-supplied trusted curve.
    pub fn curve(&self, trusted: Option<CurveId>) -> Result<CurveId> {
        match &self.anchor().public_key().domain {
            Some(domain) => domain.curve(),
            None => trusted.ok_or_else(|| {
                Error::UnsupportedAlgorithm(
                    "chain carries no domain parameters and no trusted curve was supplied"
                        .into(),
                )
            }),
        }
    }

    /// Verify signatures, validity dates and the description binding.
    ///
    /// A self-signed anchor is verified against its own key; an anchor
    /// that is not self-signed is accepted unverified, since its issuer
    /// is trusted out of band by the relying server.
    pub fn verify(
        &self,
        now: CertificateDate,
        description: Option<&CertificateDescription>,
        trusted_curve: Option<CurveId>,
    ) -> Result<()> {
        let curve = self.curve(trusted_curve)?;

        for cert in &self.certs {
            cert.check_dates(now)?;
        }

        if self.anchor().is_self_signed() {
            self.anchor()
                .verify_issued_by(self.anchor().public_key(), curve)?;
        }
        for pair in self.certs.windows(2) {
            trace!(issuer = %pair[0].chr(), holder = %pair[1].chr(), "verifying link");
            pair[1].verify_issued_by(pair[0].public_key(), curve)?;
        }

        if let Some(expected) = self.leaf().description_hash() {
            let description = description.ok_or(Error::DescriptionMismatch)?;
            let algorithm = self.leaf().public_key().algorithm()?;
            if description.hash(algorithm) != expected {
                return Err(Error::DescriptionMismatch);
            }
        }

        Ok(())
    }
}
