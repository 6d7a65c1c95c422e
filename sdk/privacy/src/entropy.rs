//! Secure entropy for spend material
//!
//! Nullifiers and secrets must come from a cryptographically secure source.
//! [`SecureEntropy`] is only implemented for `rand_core` generators that carry
//! the `TryCryptoRng` marker, so a general-purpose RNG cannot be passed by accident.
//! A failing source is fatal: no partial note is ever produced.

use rand_core::{OsRng, TryCryptoRng};

use crate::error::{PrivacyError, Result};
use crate::field::{FIELD_WIDTH_BYTES, FieldElement, decode_field};

/// A cryptographically secure byte source
pub trait SecureEntropy {
    fn fill_secure(&mut self, dest: &mut [u8]) -> Result<()>;

    /// A uniformly random element of `FIELD_WIDTH_BYTES * 8` bits
    fn field_element(&mut self) -> Result<FieldElement> {
        let mut bytes = [0u8; FIELD_WIDTH_BYTES];
        self.fill_secure(&mut bytes)?;
        decode_field(&bytes)
    }
}

impl<R: TryCryptoRng> SecureEntropy for R {
    fn fill_secure(&mut self, dest: &mut [u8]) -> Result<()> {
        self.try_fill_bytes(dest)
            .map_err(|e| PrivacyError::EntropySourceUnavailable(e.to_string()))
    }
}

/// The operating system's CSPRNG
pub fn os_entropy() -> OsRng {
    OsRng
}
