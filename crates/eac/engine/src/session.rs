//! Per-attempt key and proof material
//!
//! Everything here lives for one authentication attempt and is wiped when
//! the attempt ends, whether it succeeded, failed or was cancelled.
//! Nothing in this struct may be persisted.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Material accumulated across the two EAC phases.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeyMaterial {
    /// Server-supplied ephemeral public key for Chip Authentication,
    /// uncompressed
    pub ephemeral_public_key: Vec<u8>,
    /// Compressed form (x coordinate), bound into the TA signature
    pub compressed_ephemeral_key: Vec<u8>,
    /// Card challenge not yet consumed by a signature
    pub challenge: Vec<u8>,
    /// Authenticated auxiliary data template, when the server sent one
    pub auxiliary_data: Vec<u8>,
    /// Raw EF.CardAccess from PACE
    pub ef_card_access: Vec<u8>,
    /// Raw EF.CardSecurity read during Chip Authentication
    pub ef_card_security: Vec<u8>,
    /// Card nonce from General Authenticate
    pub nonce: Vec<u8>,
    /// Authentication token from General Authenticate
    pub authentication_token: Vec<u8>,
}

impl core::fmt::Debug for SessionKeyMaterial {
    // Lengths only; the values must not end up in logs.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionKeyMaterial")
            .field("ephemeral_public_key", &self.ephemeral_public_key.len())
            .field("challenge", &self.challenge.len())
            .field("ef_card_access", &self.ef_card_access.len())
            .field("ef_card_security", &self.ef_card_security.len())
            .field("nonce", &self.nonce.len())
            .field("authentication_token", &self.authentication_token.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_does_not_leak_values() {
        let mut material = SessionKeyMaterial::default();
        material.challenge = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let rendered = format!("{material:?}");
        assert!(!rendered.contains("DE"));
        assert!(rendered.contains("challenge: 4"));
    }
}
