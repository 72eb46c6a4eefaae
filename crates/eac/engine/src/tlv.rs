//! Small helpers on top of `iso7816_tlv`
//!
//! Parsing goes through `iso7816_tlv::ber`; construction of the few
//! structures the engine emits (CHAT, command data objects, certificate
//! signature wrapper) is done directly, since those use fixed tags.

use iso7816_tlv::ber::{Tag, Value};
pub(crate) use iso7816_tlv::ber::Tlv;

use crate::error::{Error, Result};

/// Parse exactly one BER TLV from `bytes`.
pub(crate) fn parse(bytes: &[u8]) -> Result<Tlv> {
    Ok(Tlv::from_bytes(bytes)?)
}

/// Children of a constructed TLV.
pub(crate) fn children(tlv: &Tlv) -> Result<&[Tlv]> {
    match tlv.value() {
        Value::Constructed(tlvs) => Ok(tlvs),
        Value::Primitive(_) => Err(Error::ProtocolDataMissing(
            "expected a constructed TLV value",
        )),
    }
}

/// Value of a primitive TLV.
pub(crate) fn primitive(tlv: &Tlv) -> Result<&[u8]> {
    match tlv.value() {
        Value::Primitive(bytes) => Ok(bytes),
        Value::Constructed(_) => Err(Error::ProtocolDataMissing(
            "expected a primitive TLV value",
        )),
    }
}

/// Find the first direct child with the given tag number.
pub(crate) fn find_child<'a>(tlvs: &'a [Tlv], tag: u16) -> Option<&'a Tlv> {
    let tag = Tag::try_from(tag).ok()?;
    tlvs.iter().find(|tlv| *tlv.tag() == tag)
}

/// Like [`find_child`], but a missing child is a protocol error.
pub(crate) fn expect_child<'a>(
    tlvs: &'a [Tlv],
    tag: u16,
    what: &'static str,
) -> Result<&'a Tlv> {
    find_child(tlvs, tag).ok_or(Error::ProtocolDataMissing(what))
}

/// Encode one TLV with definite length (short, `81` or `82` form).
pub(crate) fn encode(tag: &[u8], value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(tag.len() + 3 + value.len());
    out.extend_from_slice(tag);
    match value.len() {
        len @ 0..=0x7F => out.push(len as u8),
        len @ 0x80..=0xFF => {
            out.push(0x81);
            out.push(len as u8);
        }
        len => {
            debug_assert!(len <= 0xFFFF);
            out.push(0x82);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
    }
    out.extend_from_slice(value);
    out
}
