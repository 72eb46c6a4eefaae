//! Response APDU parsing and status words

use bytes::Bytes;

use crate::transport::TransportError;

/// A response APDU: payload plus trailing status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    payload: Bytes,
    status: StatusWord,
}

impl Response {
    /// Create a response from payload and status.
    pub const fn new(payload: Bytes, status: StatusWord) -> Self {
        Self { payload, status }
    }

    /// Create a `9000` response with the given payload.
    pub const fn success(payload: Bytes) -> Self {
        Self::new(payload, status::SUCCESS)
    }

    /// Parse a raw response APDU. At least the two status bytes must be present.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, TransportError> {
        if raw.len() < 2 {
            return Err(TransportError::MalformedResponse(raw.len()));
        }
        let (payload, sw) = raw.split_at(raw.len() - 2);
        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status: StatusWord::new(sw[0], sw[1]),
        })
    }

    /// Response data field without the status word.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Status word of this response.
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Whether the status word is `9000`.
    pub fn is_success(&self) -> bool {
        self.status == status::SUCCESS
    }

    /// Serialize back to wire format (payload followed by SW1/SW2).
    pub fn to_bytes(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.payload.len() + 2);
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.status.to_be_bytes());
        Bytes::from(out)
    }
}

/// A two-byte ISO 7816-4 status word.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord(pub u16);

impl StatusWord {
    /// Build from SW1/SW2.
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self(((sw1 as u16) << 8) | sw2 as u16)
    }

    /// SW1 byte.
    pub const fn sw1(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// SW2 byte.
    pub const fn sw2(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Big-endian byte representation.
    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Whether this is a warning status (`62xx`/`63xx`), i.e. the command
    /// completed but with qualified success.
    pub const fn is_warning(self) -> bool {
        matches!(self.sw1(), 0x62 | 0x63)
    }
}

impl core::fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "StatusWord({:04X})", self.0)
    }
}

impl core::fmt::Display for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl From<u16> for StatusWord {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Status words referenced by the EAC protocol.
pub mod status {
    use super::StatusWord;

    /// Normal processing
    pub const SUCCESS: StatusWord = StatusWord(0x9000);
    /// End of file reached before reading Le bytes
    pub const END_OF_FILE: StatusWord = StatusWord(0x6282);
    /// Verification failed (counter in SW2 low nibble for PIN-like objects)
    pub const WARNING_COUNTER_0: StatusWord = StatusWord(0x63C0);
    /// Security status not satisfied
    pub const SECURITY_STATUS_NOT_SATISFIED: StatusWord = StatusWord(0x6982);
    /// Authentication method blocked
    pub const AUTH_METHOD_BLOCKED: StatusWord = StatusWord(0x6983);
    /// Conditions of use not satisfied
    pub const CONDITIONS_NOT_SATISFIED: StatusWord = StatusWord(0x6985);
    /// Wrong data in the command field
    pub const WRONG_DATA: StatusWord = StatusWord(0x6A80);
    /// Referenced data (e.g. a key reference) not found
    pub const REFERENCED_DATA_NOT_FOUND: StatusWord = StatusWord(0x6A88);
    /// Wrong P1/P2 (offset outside the file for READ BINARY)
    pub const WRONG_P1P2: StatusWord = StatusWord(0x6B00);
}
