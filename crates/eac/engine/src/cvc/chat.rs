//! Certificate Holder Authorization Template
//!
//! A CHAT is the `7F4C` data object inside a card-verifiable certificate:
//! an object identifier naming the terminal type followed by a fixed-width
//! discretionary-data template. For authentication terminals the template
//! is 40 bits; the top two bits carry the holder's role, the rest are
//! per-data-group read/write access and special-function flags.
//!
//! The value is immutable; every mutator returns a new template.

use crate::error::{Error, Result};
use crate::tlv;

/// `id-IS` (0.4.0.127.0.7.3.1.2.1)
const OID_IS: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x02, 0x01];
/// `id-AT` (0.4.0.127.0.7.3.1.2.2)
const OID_AT: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x02, 0x02];
/// `id-ST` (0.4.0.127.0.7.3.1.2.3)
const OID_ST: &[u8] = &[0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x02, 0x03];

/// Fixed prefix prepended to a bare 5-byte authentication-terminal
/// template: `7F4C 12 { 06 09 id-AT, 53 05 }`.
const SHORT_FORM_PREFIX: &[u8] = &[
    0x7F, 0x4C, 0x12, 0x06, 0x09, 0x04, 0x00, 0x7F, 0x00, 0x07, 0x03, 0x01, 0x02, 0x02, 0x53,
    0x05,
];

/// Terminal type named by the CHAT's object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    /// Inspection system (border control), 1-byte template
    InspectionSystem,
    /// Authentication terminal (eID), 5-byte template
    AuthenticationTerminal,
    /// Signature terminal, 1-byte template
    SignatureTerminal,
}

impl TerminalKind {
    fn from_oid(oid: &[u8]) -> Result<Self> {
        match oid {
            _ if oid == OID_IS => Ok(Self::InspectionSystem),
            _ if oid == OID_AT => Ok(Self::AuthenticationTerminal),
            _ if oid == OID_ST => Ok(Self::SignatureTerminal),
            _ => Err(Error::UnsupportedAlgorithm(format!(
                "terminal type OID {}",
                hex::encode(oid)
            ))),
        }
    }

    fn oid(&self) -> &'static [u8] {
        match self {
            Self::InspectionSystem => OID_IS,
            Self::AuthenticationTerminal => OID_AT,
            Self::SignatureTerminal => OID_ST,
        }
    }

    fn template_len(&self) -> usize {
        match self {
            Self::AuthenticationTerminal => 5,
            Self::InspectionSystem | Self::SignatureTerminal => 1,
        }
    }
}

/// Role of the certificate holder, encoded in the template's top two bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Country verifying certificate authority (trust anchor)
    Cvca,
    /// Document verifier, official domestic
    DvOfficial,
    /// Document verifier, non-official / foreign
    DvNonOfficial,
    /// End-entity terminal
    Terminal,
}

/// Data group of the eID application, `DG1` through `DG22`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataGroup(u8);

impl DataGroup {
    /// Data group by number (1 through 22).
    pub fn new(number: u8) -> Option<Self> {
        (1..=22).contains(&number).then_some(Self(number))
    }

    /// One-based data group number.
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Bit index of this group's read-access flag. `DG1` sits at bit 31
    /// and the groups count down from there; `DG22` has no read flag.
    fn read_bit(&self) -> Option<usize> {
        (self.0 <= 21).then(|| 32 - self.0 as usize)
    }

    /// Bit index of this group's write-access flag (`DG17`..`DG22` only).
    fn write_bit(&self) -> Option<usize> {
        (17..=22).contains(&self.0).then(|| 2 + (self.0 - 17) as usize)
    }
}

/// Special functions an authentication terminal may be authorized for,
/// in template bit order (bit 32 first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialFunction {
    /// Install qualified signature certificates
    InstallQualifiedCertificate,
    /// Install signature certificates
    InstallCertificate,
    /// PIN management
    PinManagement,
    /// CAN allowed as PACE password
    CanAllowed,
    /// Privileged terminal
    PrivilegedTerminal,
    /// Restricted identification
    RestrictedIdentification,
    /// Community ID verification
    CommunityIdVerification,
    /// Age verification
    AgeVerification,
}

impl SpecialFunction {
    /// All special functions in template bit order.
    pub const ALL: [Self; 8] = [
        Self::InstallQualifiedCertificate,
        Self::InstallCertificate,
        Self::PinManagement,
        Self::CanAllowed,
        Self::PrivilegedTerminal,
        Self::RestrictedIdentification,
        Self::CommunityIdVerification,
        Self::AgeVerification,
    ];

    fn bit(&self) -> usize {
        32 + Self::ALL.iter().position(|f| f == self).unwrap_or(0)
    }
}

/// Parsed Certificate Holder Authorization Template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chat {
    kind: TerminalKind,
    template: [u8; 5],
    len: usize,
}

impl Chat {
    /// Parse a `7F4C` CHAT data object.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let outer = tlv::parse(bytes)?;
        let inner = tlv::children(&outer)?;
        let oid = tlv::primitive(tlv::expect_child(inner, 0x06, "CHAT terminal type OID")?)?;
        let raw = tlv::primitive(tlv::expect_child(inner, 0x53, "CHAT template")?)?;

        let kind = TerminalKind::from_oid(oid)?;
        if raw.len() != kind.template_len() {
            return Err(Error::ProtocolDataMissing(
                "CHAT template length does not match its terminal type",
            ));
        }
        let mut template = [0u8; 5];
        template[..raw.len()].copy_from_slice(raw);
        Ok(Self { kind, template, len: raw.len() })
    }

    /// Encode back to the `7F4C` data object. Round-trips byte-identically
    /// with [`Chat::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut inner = tlv::encode(&[0x06], self.kind.oid());
        inner.extend_from_slice(&tlv::encode(&[0x53], &self.template[..self.len]));
        tlv::encode(&[0x7F, 0x4C], &inner)
    }

    /// Terminal type of this template.
    pub fn kind(&self) -> TerminalKind {
        self.kind
    }

    /// Holder role from the template's top two bits.
    pub fn role(&self) -> Role {
        match self.template[0] & 0xC0 {
            0xC0 => Role::Cvca,
            0x80 => Role::DvOfficial,
            0x40 => Role::DvNonOfficial,
            _ => Role::Terminal,
        }
    }

    fn bit(&self, index: usize) -> bool {
        self.template[index / 8] & (0x80 >> (index % 8)) != 0
    }

    fn with_bit(mut self, index: usize, value: bool) -> Self {
        let mask = 0x80 >> (index % 8);
        if value {
            self.template[index / 8] |= mask;
        } else {
            self.template[index / 8] &= !mask;
        }
        self
    }

    /// Whether read access to `group` is granted. Only meaningful for
    /// authentication terminals; other kinds grant nothing.
    pub fn reads(&self, group: DataGroup) -> bool {
        self.kind == TerminalKind::AuthenticationTerminal
            && group.read_bit().is_some_and(|bit| self.bit(bit))
    }

    /// Whether write access to `group` is granted.
    pub fn writes(&self, group: DataGroup) -> bool {
        self.kind == TerminalKind::AuthenticationTerminal
            && group.write_bit().is_some_and(|bit| self.bit(bit))
    }

    /// Whether `function` is authorized.
    pub fn has_special(&self, function: SpecialFunction) -> bool {
        self.kind == TerminalKind::AuthenticationTerminal && self.bit(function.bit())
    }

    /// Copy with read access to `group` set to `value`.
    pub fn with_read(self, group: DataGroup, value: bool) -> Self {
        match group.read_bit() {
            Some(bit) => self.with_bit(bit, value),
            None => self,
        }
    }

    /// Copy with write access to `group` set to `value`.
    pub fn with_write(self, group: DataGroup, value: bool) -> Self {
        match group.write_bit() {
            Some(bit) => self.with_bit(bit, value),
            None => self,
        }
    }

    /// Copy with `function` set to `value`.
    pub fn with_special(self, function: SpecialFunction, value: bool) -> Self {
        self.with_bit(function.bit(), value)
    }

    /// Copy with every access and special-function bit cleared. The role
    /// bits are preserved.
    pub fn cleared(self) -> Self {
        let role = self.template[0] & 0xC0;
        let mut template = [0u8; 5];
        template[0] = role;
        Self { template, ..self }
    }

    /// Intersection of two templates of the same kind. The role bits of
    /// `self` are preserved; all access bits are ANDed.
    pub fn restrict(&self, other: &Self) -> Result<Self> {
        if self.kind != other.kind {
            return Err(Error::ChatNotPermitted);
        }
        let role = self.template[0] & 0xC0;
        let mut template = [0u8; 5];
        for (slot, (a, b)) in template.iter_mut().zip(self.template.iter().zip(&other.template)) {
            *slot = a & b;
        }
        template[0] = (template[0] & 0x3F) | role;
        Ok(Self { template, ..*self })
    }

    /// Whether every access bit granted by `self` is also granted by
    /// `other`. Role bits are ignored.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        self.template
            .iter()
            .zip(&other.template)
            .enumerate()
            .all(|(index, (a, b))| {
                let mask = if index == 0 { 0x3F } else { 0xFF };
                (a & mask) & !(b & mask) == 0
            })
    }
}

/// Repair a bare 5-byte authentication-terminal template sent without its
/// `7F4C` wrapper. Anything else passes through unchanged.
pub fn repair_short_form(bytes: &[u8]) -> Vec<u8> {
    if bytes.len() == 5 {
        let mut repaired = SHORT_FORM_PREFIX.to_vec();
        repaired.extend_from_slice(bytes);
        repaired
    } else {
        bytes.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dg(number: u8) -> DataGroup {
        DataGroup::new(number).unwrap()
    }

    fn sample() -> Vec<u8> {
        hex::decode("7f4c12060904007f0007030102025305300301ffb7").unwrap()
    }

    #[test]
    fn decode_authentication_terminal_template() {
        let chat = Chat::from_bytes(&sample()).unwrap();
        assert_eq!(chat.kind(), TerminalKind::AuthenticationTerminal);
        assert_eq!(chat.role(), Role::Terminal);

        for number in 1..=9 {
            assert!(chat.reads(dg(number)), "DG{number} read access expected");
        }
        for number in 10..=16 {
            assert!(!chat.reads(dg(number)), "DG{number} read access unexpected");
        }
        assert!(chat.reads(dg(17)));
        assert!(chat.reads(dg(18)));
        assert!(chat.writes(dg(17)));
        assert!(chat.writes(dg(18)));
        assert!(!chat.writes(dg(19)));

        assert!(chat.has_special(SpecialFunction::AgeVerification));
        assert!(chat.has_special(SpecialFunction::RestrictedIdentification));
        assert!(chat.has_special(SpecialFunction::CanAllowed));
        assert!(!chat.has_special(SpecialFunction::PrivilegedTerminal));
        assert!(!chat.has_special(SpecialFunction::InstallCertificate));
    }

    #[test]
    fn encode_round_trips_byte_identically() {
        let bytes = sample();
        let chat = Chat::from_bytes(&bytes).unwrap();
        assert_eq!(chat.to_bytes(), bytes);
    }

    #[test]
    fn clearing_read_access_re_encodes_as_expected() {
        let chat = Chat::from_bytes(&sample()).unwrap();
        let narrowed = chat
            .with_read(dg(1), false)
            .with_read(dg(2), false)
            .with_read(dg(3), false)
            .with_read(dg(4), false);
        assert_eq!(
            hex::encode(narrowed.to_bytes()),
            "7f4c12060904007f0007030102025305300301f0b7"
        );
    }

    #[test]
    fn mutators_do_not_touch_the_original() {
        let chat = Chat::from_bytes(&sample()).unwrap();
        let _ = chat.with_special(SpecialFunction::PrivilegedTerminal, true);
        assert!(!chat.has_special(SpecialFunction::PrivilegedTerminal));
    }

    #[test]
    fn subset_and_restrict() {
        let optional = Chat::from_bytes(&sample()).unwrap();
        let narrowed = optional.with_read(dg(9), false).with_write(dg(18), false);
        assert!(narrowed.is_subset_of(&optional));
        assert!(!optional.is_subset_of(&narrowed));

        let restricted = optional.restrict(&narrowed).unwrap();
        assert_eq!(restricted, narrowed);
        assert_eq!(restricted.role(), Role::Terminal);
    }

    #[test]
    fn cleared_keeps_only_the_role() {
        let bytes = hex::decode("7f4c12060904007f000703010202530580000000ff").unwrap();
        let chat = Chat::from_bytes(&bytes).unwrap().cleared();
        assert_eq!(chat.role(), Role::DvOfficial);
        assert!(!chat.has_special(SpecialFunction::AgeVerification));
        assert!(!chat.reads(dg(1)));
    }

    #[test]
    fn short_form_repair() {
        let raw = [0x30, 0x03, 0x01, 0xFF, 0xB7];
        let repaired = repair_short_form(&raw);
        assert_eq!(hex::encode(&repaired), "7f4c12060904007f0007030102025305300301ffb7");
        assert!(Chat::from_bytes(&repaired).is_ok());

        let wrapped = sample();
        assert_eq!(repair_short_form(&wrapped), wrapped);
    }

    #[test]
    fn rejects_mismatched_template_length() {
        // id-AT with a 1-byte template
        let bytes = hex::decode("7f4c0e060904007f000703010202530100").unwrap();
        assert!(Chat::from_bytes(&bytes).is_err());
    }
}
