//! Card-verifiable certificates (CVC)
//!
//! The compact certificate format used for Terminal Authentication:
//! `7F21 { 7F4E body, 5F37 signature }` with a fixed set of body data
//! objects. Only the subset needed for EAC is implemented; this is not a
//! general ASN.1 stack.

use bytes::Bytes;

use crate::crypto::{CurveId, CvcVerifyingKey, TaAlgorithm};
use crate::error::{Error, Result};
use crate::tlv;

pub mod chain;
pub mod chat;

pub use chain::CvcChain;
pub use chat::{Chat, DataGroup, Role, SpecialFunction, TerminalKind};

/// `id-description` (0.4.0.127.0.7.3.1.3.1), the certificate description
/// extension.
const OID_DESCRIPTION: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x03, 0x01];

/// Certificate holder or authority reference: country code, holder
/// mnemonic and sequence number as printable ASCII.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyReference(Vec<u8>);

impl PublicKeyReference {
    /// Reference from its raw encoding (8 to 16 characters).
    pub fn new(raw: impl Into<Vec<u8>>) -> Result<Self> {
        let raw = raw.into();
        if (8..=16).contains(&raw.len()) {
            Ok(Self(raw))
        } else {
            Err(Error::ProtocolDataMissing("key reference of invalid length"))
        }
    }

    /// Raw reference bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Display for PublicKeyReference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl core::fmt::Debug for PublicKeyReference {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PublicKeyReference({self})")
    }
}

/// Certificate validity date, encoded as six BCD digits (`YYMMDD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CertificateDate {
    year: u16,
    month: u8,
    day: u8,
}

impl CertificateDate {
    /// Date from calendar components. Years before 2000 cannot be encoded.
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self> {
        if (2000..2100).contains(&year) && (1..=12).contains(&month) && (1..=31).contains(&day) {
            Ok(Self { year, month, day })
        } else {
            Err(Error::ProtocolDataMissing("calendar date out of range"))
        }
    }

    /// Parse the six-digit BCD encoding used inside certificates.
    pub fn from_bcd(raw: &[u8]) -> Result<Self> {
        if raw.len() != 6 || raw.iter().any(|digit| *digit > 9) {
            return Err(Error::ProtocolDataMissing("malformed BCD date"));
        }
        Self::new(
            2000 + u16::from(raw[0]) * 10 + u16::from(raw[1]),
            raw[2] * 10 + raw[3],
            raw[4] * 10 + raw[5],
        )
    }

    /// Parse an ISO `YYYY-MM-DD` string, as carried in server messages.
    pub fn from_iso8601(text: &str) -> Result<Self> {
        let parse = |part: Option<&str>| -> Result<u16> {
            part.and_then(|p| p.parse().ok())
                .ok_or(Error::ProtocolDataMissing("malformed ISO date"))
        };
        let mut parts = text.split('-');
        let year = parse(parts.next())?;
        let month = parse(parts.next())?;
        let day = parse(parts.next())?;
        if parts.next().is_some() {
            return Err(Error::ProtocolDataMissing("malformed ISO date"));
        }
        Self::new(year, month as u8, day as u8)
    }

    /// Six-digit BCD encoding.
    pub fn to_bcd(&self) -> [u8; 6] {
        let yy = (self.year - 2000) as u8;
        [yy / 10, yy % 10, self.month / 10, self.month % 10, self.day / 10, self.day % 10]
    }
}

/// Explicit elliptic-curve domain parameters, carried by trust-anchor
/// certificates. Subordinate certificates inherit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainParameters {
    /// Field prime
    pub prime: Vec<u8>,
    /// Curve coefficient a
    pub coefficient_a: Vec<u8>,
    /// Curve coefficient b
    pub coefficient_b: Vec<u8>,
    /// Base point, uncompressed
    pub base_point: Vec<u8>,
    /// Order of the base point
    pub order: Vec<u8>,
    /// Cofactor
    pub cofactor: Vec<u8>,
}

impl DomainParameters {
    /// Resolve the named curve these parameters spell out.
    pub fn curve(&self) -> Result<CurveId> {
        CurveId::from_prime(&self.prime)
    }
}

/// Public key data object (`7F49`) of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvcPublicKey {
    /// Signature suite object identifier
    pub oid: Vec<u8>,
    /// Explicit domain parameters, present on trust anchors only
    pub domain: Option<DomainParameters>,
    /// Public point, uncompressed SEC1 encoding
    pub point: Vec<u8>,
}

impl CvcPublicKey {
    fn from_tlvs(tlvs: &[tlv::Tlv]) -> Result<Self> {
        let oid = tlv::primitive(tlv::expect_child(tlvs, 0x06, "public key OID")?)?.to_vec();
        let point =
            tlv::primitive(tlv::expect_child(tlvs, 0x86, "public key point")?)?.to_vec();
        let domain = match tlv::find_child(tlvs, 0x81) {
            Some(prime) => Some(DomainParameters {
                prime: tlv::primitive(prime)?.to_vec(),
                coefficient_a: tlv::primitive(tlv::expect_child(tlvs, 0x82, "coefficient a")?)?
                    .to_vec(),
                coefficient_b: tlv::primitive(tlv::expect_child(tlvs, 0x83, "coefficient b")?)?
                    .to_vec(),
                base_point: tlv::primitive(tlv::expect_child(tlvs, 0x84, "base point")?)?
                    .to_vec(),
                order: tlv::primitive(tlv::expect_child(tlvs, 0x85, "base point order")?)?
                    .to_vec(),
                cofactor: tlv::primitive(tlv::expect_child(tlvs, 0x87, "cofactor")?)?.to_vec(),
            }),
            None => None,
        };
        Ok(Self { oid, domain, point })
    }

    /// Signature suite of this key.
    pub fn algorithm(&self) -> Result<TaAlgorithm> {
        TaAlgorithm::from_oid(&self.oid)
    }

    /// Verifying key on `curve`, used to check subordinate certificates.
    pub fn verifying_key(&self, curve: CurveId) -> Result<CvcVerifyingKey> {
        CvcVerifyingKey::from_point(curve, &self.point)
    }
}

/// A parsed, immutable card-verifiable certificate.
#[derive(Debug, Clone)]
pub struct CardVerifiableCertificate {
    raw: Bytes,
    body: Bytes,
    signature: Vec<u8>,
    profile_id: u8,
    car: PublicKeyReference,
    chr: PublicKeyReference,
    public_key: CvcPublicKey,
    chat: Chat,
    effective: CertificateDate,
    expiration: CertificateDate,
    description_hash: Option<Vec<u8>>,
}

impl CardVerifiableCertificate {
    /// Parse a `7F21` certificate.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let outer = tlv::parse(bytes)?;
        let parts = tlv::children(&outer)?;
        let body_tlv = tlv::expect_child(parts, 0x7F4E, "certificate body")?;
        let body_children = tlv::children(body_tlv)?;
        let signature =
            tlv::primitive(tlv::expect_child(parts, 0x5F37, "certificate signature")?)?.to_vec();

        let profile =
            tlv::primitive(tlv::expect_child(body_children, 0x5F29, "profile identifier")?)?;
        let profile_id = *profile
            .first()
            .ok_or(Error::ProtocolDataMissing("profile identifier"))?;
        let car = PublicKeyReference::new(tlv::primitive(tlv::expect_child(
            body_children,
            0x42,
            "certification authority reference",
        )?)?)?;
        let chr = PublicKeyReference::new(tlv::primitive(tlv::expect_child(
            body_children,
            0x5F20,
            "certificate holder reference",
        )?)?)?;
        let public_key = CvcPublicKey::from_tlvs(tlv::children(tlv::expect_child(
            body_children,
            0x7F49,
            "public key",
        )?)?)?;
        let chat_tlv = tlv::expect_child(body_children, 0x7F4C, "holder authorization template")?;
        let chat = Chat::from_bytes(&chat_tlv.to_vec())?;
        let effective = CertificateDate::from_bcd(tlv::primitive(tlv::expect_child(
            body_children,
            0x5F25,
            "effective date",
        )?)?)?;
        let expiration = CertificateDate::from_bcd(tlv::primitive(tlv::expect_child(
            body_children,
            0x5F24,
            "expiration date",
        )?)?)?;
        let description_hash = match tlv::find_child(body_children, 0x65) {
            Some(extensions) => Self::description_hash_from(extensions)?,
            None => None,
        };

        Ok(Self {
            raw: Bytes::copy_from_slice(bytes),
            body: Bytes::from(body_tlv.to_vec()),
            signature,
            profile_id,
            car,
            chr,
            public_key,
            chat,
            effective,
            expiration,
            description_hash,
        })
    }

    fn description_hash_from(extensions: &tlv::Tlv) -> Result<Option<Vec<u8>>> {
        for template in tlv::children(extensions)? {
            let fields = tlv::children(template)?;
            let oid = tlv::primitive(tlv::expect_child(fields, 0x06, "extension OID")?)?;
            if oid == OID_DESCRIPTION {
                let hash =
                    tlv::primitive(tlv::expect_child(fields, 0x80, "description hash")?)?;
                return Ok(Some(hash.to_vec()));
            }
        }
        Ok(None)
    }

    /// Full certificate encoding as received.
    pub fn as_bytes(&self) -> &Bytes {
        &self.raw
    }

    /// Encoded certificate body, the input to signature verification.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Raw `r || s` signature value.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Certificate profile identifier (`5F29`).
    pub fn profile_id(&self) -> u8 {
        self.profile_id
    }

    /// Issuer reference.
    pub fn car(&self) -> &PublicKeyReference {
        &self.car
    }

    /// Holder reference.
    pub fn chr(&self) -> &PublicKeyReference {
        &self.chr
    }

    /// Public key of the holder.
    pub fn public_key(&self) -> &CvcPublicKey {
        &self.public_key
    }

    /// Holder authorization template.
    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    /// First day of validity.
    pub fn effective(&self) -> CertificateDate {
        self.effective
    }

    /// Last day of validity.
    pub fn expiration(&self) -> CertificateDate {
        self.expiration
    }

    /// Hash bound to the human-readable certificate description, if the
    /// certificate carries the extension.
    pub fn description_hash(&self) -> Option<&[u8]> {
        self.description_hash.as_deref()
    }

    /// Whether issuer and holder reference coincide (trust anchor).
    pub fn is_self_signed(&self) -> bool {
        self.car == self.chr
    }

    /// Body and signature data objects concatenated, the command payload
    /// for loading this certificate onto a card.
    pub fn body_and_signature(&self) -> Vec<u8> {
        let mut payload = self.body.to_vec();
        payload.extend_from_slice(&tlv::encode(&[0x5F, 0x37], &self.signature));
        payload
    }

    /// Check validity dates against `now`.
    pub fn check_dates(&self, now: CertificateDate) -> Result<()> {
        if now < self.effective {
            Err(Error::CertificateNotYetValid)
        } else if now > self.expiration {
            Err(Error::CertificateExpired)
        } else {
            Ok(())
        }
    }

    /// Verify this certificate's signature against its issuer's key.
    pub fn verify_issued_by(&self, issuer: &CvcPublicKey, curve: CurveId) -> Result<()> {
        let algorithm = issuer.algorithm()?;
        issuer
            .verifying_key(curve)?
            .verify(algorithm, &self.body, &self.signature)
    }
}

/// Human-readable certificate description, bound to the terminal
/// certificate by a hash extension.
#[derive(Debug, Clone)]
pub struct CertificateDescription {
    raw: Vec<u8>,
    /// Name of the certificate issuer
    pub issuer_name: Option<String>,
    /// URL of the certificate issuer
    pub issuer_url: Option<String>,
    /// Name of the service provider
    pub subject_name: Option<String>,
    /// URL of the service provider
    pub subject_url: Option<String>,
    /// Terms of usage shown to the user
    pub terms_of_usage: Option<String>,
}

impl CertificateDescription {
    /// Parse the DER-encoded description structure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let outer = tlv::parse(bytes)?;
        let fields = tlv::children(&outer)?;
        // descriptionType OID must be present even though we do not
        // branch on the format variant.
        tlv::expect_child(fields, 0x06, "description type OID")?;

        let text_at = |tag: u16| -> Result<Option<String>> {
            match tlv::find_child(fields, tag) {
                Some(wrapper) => {
                    let inner = tlv::children(wrapper)?;
                    let value = inner
                        .first()
                        .ok_or(Error::ProtocolDataMissing("empty description field"))?;
                    Ok(Some(
                        String::from_utf8_lossy(tlv::primitive(value)?).into_owned(),
                    ))
                }
                None => Ok(None),
            }
        };

        Ok(Self {
            raw: bytes.to_vec(),
            issuer_name: text_at(0xA1)?,
            issuer_url: text_at(0xA2)?,
            subject_name: text_at(0xA3)?,
            subject_url: text_at(0xA4)?,
            terms_of_usage: text_at(0xA5)?,
        })
    }

    /// Raw encoding as received, the input to the binding hash.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Hash of the raw encoding under `algorithm`'s digest.
    pub fn hash(&self, algorithm: TaAlgorithm) -> Vec<u8> {
        algorithm.digest(&self.raw)
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Builders for synthetic, correctly signed certificates on NIST P-256.

    use p256::ecdsa::signature::hazmat::PrehashSigner;
    use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
    use p256::elliptic_curve::sec1::ToEncodedPoint;

    use super::*;
    use crate::crypto::{OID_TA_ECDSA_SHA_256, P256_PRIME};

    pub(crate) const P256_A: &[u8] = &[
        0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xFF, 0xFF, 0xFC,
    ];
    pub(crate) const P256_B: &[u8] = &[
        0x5A, 0xC6, 0x35, 0xD8, 0xAA, 0x3A, 0x93, 0xE7, 0xB3, 0xEB, 0xBD, 0x55, 0x76, 0x98,
        0x86, 0xBC, 0x65, 0x1D, 0x06, 0xB0, 0xCC, 0x53, 0xB0, 0xF6, 0x3B, 0xCE, 0x3C, 0x3E,
        0x27, 0xD2, 0x60, 0x4B,
    ];
    pub(crate) const P256_BASE: &[u8] = &[
        0x04, 0x6B, 0x17, 0xD1, 0xF2, 0xE1, 0x2C, 0x42, 0x47, 0xF8, 0xBC, 0xE6, 0xE5, 0x63,
        0xA4, 0x40, 0xF2, 0x77, 0x03, 0x7D, 0x81, 0x2D, 0xEB, 0x33, 0xA0, 0xF4, 0xA1, 0x39,
        0x45, 0xD8, 0x98, 0xC2, 0x96, 0x4F, 0xE3, 0x42, 0xE2, 0xFE, 0x1A, 0x7F, 0x9B, 0x8E,
        0xE7, 0xEB, 0x4A, 0x7C, 0x0F, 0x9E, 0x16, 0x2B, 0xCE, 0x33, 0x57, 0x6B, 0x31, 0x5E,
        0xCE, 0xCB, 0xB6, 0x40, 0x68, 0x37, 0xBF, 0x51, 0xF5,
    ];
    pub(crate) const P256_ORDER: &[u8] = &[
        0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFF, 0xFF, 0xBC, 0xE6, 0xFA, 0xAD, 0xA7, 0x17, 0x9E, 0x84, 0xF3, 0xB9, 0xCA, 0xC2,
        0xFC, 0x63, 0x25, 0x51,
    ];

    /// CHAT bytes of an authentication terminal with a given role byte and
    /// otherwise broad access.
    pub(crate) fn chat_bytes(role: u8) -> Vec<u8> {
        let mut template = vec![role, 0x03, 0x01, 0xFF, 0xB7];
        template[0] |= 0x30;
        let mut inner = tlv::encode(&[0x06], &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x02, 0x02]);
        inner.extend_from_slice(&tlv::encode(&[0x53], &template));
        tlv::encode(&[0x7F, 0x4C], &inner)
    }

    /// Parameters for one synthetic certificate.
    pub(crate) struct CertSpec<'a> {
        pub car: &'a str,
        pub chr: &'a str,
        pub role: u8,
        pub subject: &'a VerifyingKey,
        pub signer: &'a SigningKey,
        pub with_domain_params: bool,
        pub description_hash: Option<Vec<u8>>,
        pub effective: CertificateDate,
        pub expiration: CertificateDate,
    }

    /// Build and sign one certificate.
    pub(crate) fn build_cert(spec: &CertSpec<'_>) -> Vec<u8> {
        let point = spec.subject.to_encoded_point(false);

        let mut key = tlv::encode(&[0x06], OID_TA_ECDSA_SHA_256);
        if spec.with_domain_params {
            key.extend_from_slice(&tlv::encode(&[0x81], P256_PRIME));
            key.extend_from_slice(&tlv::encode(&[0x82], P256_A));
            key.extend_from_slice(&tlv::encode(&[0x83], P256_B));
            key.extend_from_slice(&tlv::encode(&[0x84], P256_BASE));
            key.extend_from_slice(&tlv::encode(&[0x85], P256_ORDER));
        }
        key.extend_from_slice(&tlv::encode(&[0x86], point.as_bytes()));
        if spec.with_domain_params {
            key.extend_from_slice(&tlv::encode(&[0x87], &[0x01]));
        }

        let mut body = tlv::encode(&[0x5F, 0x29], &[0x00]);
        body.extend_from_slice(&tlv::encode(&[0x42], spec.car.as_bytes()));
        body.extend_from_slice(&tlv::encode(&[0x7F, 0x49], &key));
        body.extend_from_slice(&tlv::encode(&[0x5F, 0x20], spec.chr.as_bytes()));
        body.extend_from_slice(&chat_bytes(spec.role));
        body.extend_from_slice(&tlv::encode(&[0x5F, 0x25], &spec.effective.to_bcd()));
        body.extend_from_slice(&tlv::encode(&[0x5F, 0x24], &spec.expiration.to_bcd()));
        if let Some(hash) = &spec.description_hash {
            let mut template = tlv::encode(&[0x06], OID_DESCRIPTION);
            template.extend_from_slice(&tlv::encode(&[0x80], hash));
            body.extend_from_slice(&tlv::encode(&[0x65], &tlv::encode(&[0x73], &template)));
        }
        let body = tlv::encode(&[0x7F, 0x4E], &body);

        let digest = TaAlgorithm::EcdsaSha256.digest(&body);
        let signature: Signature = spec.signer.sign_prehash(&digest).unwrap();

        let mut cert = body;
        cert.extend_from_slice(&tlv::encode(&[0x5F, 0x37], &signature.to_bytes()));
        tlv::encode(&[0x7F, 0x21], &cert)
    }

    /// A minimal DER certificate description.
    pub(crate) fn description_bytes(subject: &str) -> Vec<u8> {
        let mut fields = tlv::encode(
            &[0x06],
            &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x03, 0x01, 0x01],
        );
        fields.extend_from_slice(&tlv::encode(&[0xA1], &tlv::encode(&[0x0C], b"Test Issuer")));
        fields.extend_from_slice(&tlv::encode(&[0xA3], &tlv::encode(&[0x0C], subject.as_bytes())));
        fields.extend_from_slice(&tlv::encode(
            &[0xA5],
            &tlv::encode(&[0x0C], b"Terms of usage."),
        ));
        tlv::encode(&[0x30], &fields)
    }
}

#[cfg(test)]
mod tests {
    use p256::ecdsa::SigningKey;
    use rand_v8::rngs::OsRng;

    use super::testutil::{build_cert, description_bytes, CertSpec};
    use super::*;

    fn date(year: u16, month: u8, day: u8) -> CertificateDate {
        CertificateDate::new(year, month, day).unwrap()
    }

    fn anchor_spec<'a>(
        key: &'a SigningKey,
        subject: &'a p256::ecdsa::VerifyingKey,
    ) -> CertSpec<'a> {
        CertSpec {
            car: "DETESTCVCA001",
            chr: "DETESTCVCA001",
            role: 0xC0,
            subject,
            signer: key,
            with_domain_params: true,
            description_hash: None,
            effective: date(2025, 1, 1),
            expiration: date(2030, 1, 1),
        }
    }

    #[test]
    fn parse_self_signed_anchor() {
        let key = SigningKey::random(&mut OsRng);
        let verifying = *key.verifying_key();
        let bytes = build_cert(&anchor_spec(&key, &verifying));

        let cert = CardVerifiableCertificate::from_bytes(&bytes).unwrap();
        assert!(cert.is_self_signed());
        assert_eq!(cert.car().to_string(), "DETESTCVCA001");
        assert_eq!(cert.chr().to_string(), "DETESTCVCA001");
        assert_eq!(cert.profile_id(), 0);
        assert_eq!(cert.chat().role(), Role::Cvca);
        assert_eq!(cert.effective(), date(2025, 1, 1));
        assert_eq!(cert.expiration(), date(2030, 1, 1));

        let domain = cert.public_key().domain.as_ref().unwrap();
        assert_eq!(domain.curve().unwrap(), CurveId::NistP256);
        cert.verify_issued_by(cert.public_key(), CurveId::NistP256)
            .unwrap();
    }

    #[test]
    fn date_window_checks() {
        let key = SigningKey::random(&mut OsRng);
        let verifying = *key.verifying_key();
        let cert =
            CardVerifiableCertificate::from_bytes(&build_cert(&anchor_spec(&key, &verifying)))
                .unwrap();

        cert.check_dates(date(2026, 8, 23)).unwrap();
        assert!(matches!(
            cert.check_dates(date(2024, 12, 31)),
            Err(Error::CertificateNotYetValid)
        ));
        assert!(matches!(
            cert.check_dates(date(2030, 1, 2)),
            Err(Error::CertificateExpired)
        ));
    }

    #[test]
    fn description_hash_binding() {
        let key = SigningKey::random(&mut OsRng);
        let verifying = *key.verifying_key();
        let description =
            CertificateDescription::from_bytes(&description_bytes("Test Service")).unwrap();
        assert_eq!(description.subject_name.as_deref(), Some("Test Service"));
        assert_eq!(description.issuer_name.as_deref(), Some("Test Issuer"));

        let mut spec = anchor_spec(&key, &verifying);
        spec.role = 0x00;
        spec.chr = "DETESTTERM001";
        spec.with_domain_params = false;
        spec.description_hash = Some(description.hash(TaAlgorithm::EcdsaSha256));

        let cert = CardVerifiableCertificate::from_bytes(&build_cert(&spec)).unwrap();
        assert_eq!(
            cert.description_hash().unwrap(),
            description.hash(TaAlgorithm::EcdsaSha256).as_slice()
        );
    }

    #[test]
    fn bcd_and_iso_dates_agree() {
        // 5 digits is malformed
        assert!(CertificateDate::from_bcd(&[2, 6, 0, 8, 2]).is_err());

        let bcd = CertificateDate::from_bcd(&[2, 6, 0, 8, 2, 3]).unwrap();
        let iso = CertificateDate::from_iso8601("2026-08-23").unwrap();
        assert_eq!(bcd, iso);
        assert_eq!(bcd.to_bcd(), [2, 6, 0, 8, 2, 3]);
        assert!(CertificateDate::from_iso8601("2026-8").is_err());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let key = SigningKey::random(&mut OsRng);
        let verifying = *key.verifying_key();
        let mut bytes = build_cert(&anchor_spec(&key, &verifying));
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;

        let cert = CardVerifiableCertificate::from_bytes(&bytes).unwrap();
        assert!(matches!(
            cert.verify_issued_by(cert.public_key(), CurveId::NistP256),
            Err(Error::SignatureInvalid)
        ));
    }
}
