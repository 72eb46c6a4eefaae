//! Cryptographic primitives for Terminal and Chip Authentication
//!
//! Object identifiers follow TR-03110 part 3. Signatures inside
//! card-verifiable certificates and the External Authenticate step are
//! plain ECDSA over the raw concatenation `r || s`, verified against a
//! digest chosen by the protocol object identifier.

use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::{Error, Result};

/// `id-TA-ECDSA-SHA-256` (0.4.0.127.0.7.2.2.2.2.3)
pub const OID_TA_ECDSA_SHA_256: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x02, 0x02, 0x03];
/// `id-TA-ECDSA-SHA-384` (0.4.0.127.0.7.2.2.2.2.4)
pub const OID_TA_ECDSA_SHA_384: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x02, 0x02, 0x04];
/// `id-TA-ECDSA-SHA-512` (0.4.0.127.0.7.2.2.2.2.5)
pub const OID_TA_ECDSA_SHA_512: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x02, 0x02, 0x05];

/// `id-CA-ECDH` (0.4.0.127.0.7.2.2.3.2), prefix of all ECDH chip
/// authentication variants.
pub const OID_CA_ECDH: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x03, 0x02];
/// `id-CA-ECDH-AES-CBC-CMAC-128` (0.4.0.127.0.7.2.2.3.2.2)
pub const OID_CA_ECDH_AES_CBC_CMAC_128: &[u8] =
    &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x02, 0x02, 0x03, 0x02, 0x02];

/// `standardizedDomainParameters` (0.4.0.127.0.7.1.2)
pub const OID_STANDARDIZED_DOMAIN_PARAMETERS: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x01, 0x02];

/// Prime of the NIST P-256 field, used to recognize explicit domain
/// parameters that spell out the standardized curve.
pub(crate) const P256_PRIME: &[u8] = &[
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF,
];

/// Terminal Authentication signature suite, selected by the certificate's
/// public key object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaAlgorithm {
    /// ECDSA with SHA-256
    EcdsaSha256,
    /// ECDSA with SHA-384
    EcdsaSha384,
    /// ECDSA with SHA-512
    EcdsaSha512,
}

impl TaAlgorithm {
    /// Resolve a TA algorithm from its object identifier.
    pub fn from_oid(oid: &[u8]) -> Result<Self> {
        match oid {
            _ if oid == OID_TA_ECDSA_SHA_256 => Ok(Self::EcdsaSha256),
            _ if oid == OID_TA_ECDSA_SHA_384 => Ok(Self::EcdsaSha384),
            _ if oid == OID_TA_ECDSA_SHA_512 => Ok(Self::EcdsaSha512),
            _ => Err(Error::UnsupportedAlgorithm(format!(
                "terminal authentication OID {}",
                hex::encode(oid)
            ))),
        }
    }

    /// Object identifier bytes of this suite.
    pub fn oid(&self) -> &'static [u8] {
        match self {
            Self::EcdsaSha256 => OID_TA_ECDSA_SHA_256,
            Self::EcdsaSha384 => OID_TA_ECDSA_SHA_384,
            Self::EcdsaSha512 => OID_TA_ECDSA_SHA_512,
        }
    }

    /// Digest of `data` under this suite's hash function.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::EcdsaSha256 => Sha256::digest(data).to_vec(),
            Self::EcdsaSha384 => Sha384::digest(data).to_vec(),
            Self::EcdsaSha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Elliptic curve a certificate's domain parameters resolve to.
///
/// Only curves this engine can verify on are listed; everything else is
/// rejected as unsupported before any card command is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveId {
    /// NIST P-256 (standardized domain parameter id 12)
    NistP256,
}

impl CurveId {
    /// Map a `standardizedDomainParameters` identifier to a curve.
    pub fn from_standardized_id(id: u8) -> Result<Self> {
        match id {
            12 => Ok(Self::NistP256),
            other => Err(Error::UnsupportedAlgorithm(format!(
                "standardized domain parameter set {other}"
            ))),
        }
    }

    /// Recognize explicit domain parameters by their field prime.
    pub fn from_prime(prime: &[u8]) -> Result<Self> {
        if prime == P256_PRIME {
            Ok(Self::NistP256)
        } else {
            Err(Error::UnsupportedAlgorithm(format!(
                "explicit domain parameters with prime {}",
                hex::encode(prime)
            )))
        }
    }
}

/// A certificate's public key, ready to verify signatures issued under it.
#[derive(Debug, Clone)]
pub struct CvcVerifyingKey {
    key: VerifyingKey,
}

impl CvcVerifyingKey {
    /// Build a verifying key from a SEC1 encoded point (compressed or
    /// uncompressed) on the given curve.
    pub fn from_point(curve: CurveId, point: &[u8]) -> Result<Self> {
        match curve {
            CurveId::NistP256 => {
                let key = VerifyingKey::from_sec1_bytes(point)
                    .map_err(|_| Error::SignatureInvalid)?;
                Ok(Self { key })
            }
        }
    }

    /// Verify a raw `r || s` signature over `data`, hashed per `algorithm`.
    pub fn verify(&self, algorithm: TaAlgorithm, data: &[u8], signature: &[u8]) -> Result<()> {
        let signature = Signature::from_slice(signature).map_err(|_| Error::SignatureInvalid)?;
        let digest = algorithm.digest(data);
        self.key
            .verify_prehash(&digest, &signature)
            .map_err(|_| Error::SignatureInvalid)
    }
}

/// Compressed form of a public point as used by Terminal Authentication:
/// the x coordinate alone.
pub fn compress_public_point(uncompressed: &[u8]) -> Result<Vec<u8>> {
    // SEC1 uncompressed: 0x04 || x || y with equal-length coordinates.
    if uncompressed.first() != Some(&0x04) || uncompressed.len() % 2 != 1 {
        return Err(Error::ProtocolDataMissing(
            "public key is not an uncompressed point",
        ));
    }
    let coordinate_len = (uncompressed.len() - 1) / 2;
    Ok(uncompressed[1..1 + coordinate_len].to_vec())
}
