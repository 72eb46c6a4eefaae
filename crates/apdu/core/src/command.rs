//! Command APDU construction
//!
//! Only short APDUs are produced here. The EAC protocol reads larger files
//! (EF.CardSecurity) in chunks instead of relying on extended length, since
//! not every contactless reader path supports extended APDUs.

use bytes::{BufMut, Bytes, BytesMut};

/// A command APDU (CLA, INS, P1, P2, optional data, optional Le).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data field
    pub data: Option<Bytes>,
    /// Expected response length; 256 is encoded as `Le = 0x00`
    pub le: Option<u16>,
}

impl Command {
    /// Create a case-1 command (header only).
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Attach a data field.
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Attach an expected length. Values above 256 are clamped to 256.
    pub fn with_le(mut self, le: u16) -> Self {
        self.le = Some(le.min(256));
        self
    }

    /// Serialize to wire format.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(
            4 + self.data.as_ref().map(|d| d.len() + 1).unwrap_or(0) + usize::from(self.le.is_some()),
        );
        buf.put_u8(self.cla);
        buf.put_u8(self.ins);
        buf.put_u8(self.p1);
        buf.put_u8(self.p2);
        if let Some(data) = &self.data {
            debug_assert!(data.len() <= 255);
            buf.put_u8(data.len() as u8);
            buf.put_slice(data);
        }
        if let Some(le) = self.le {
            // Le = 0x00 requests the maximum of 256 bytes
            buf.put_u8((le % 256) as u8);
        }
        buf.freeze()
    }
}
