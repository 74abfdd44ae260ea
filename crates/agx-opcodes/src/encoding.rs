//! Machine encoding descriptors
//!
//! An instruction either has a single word length or is extensible: it comes
//! in a compact and an extended form. The extended form is always exactly one
//! growth quantum longer than the compact one.

use crate::error::{RegistryError, Result};

/// Short lengths above this grow by [`LARGE_GROWTH`], others by [`SMALL_GROWTH`]
pub const GROWTH_THRESHOLD: u8 = 8;

/// Growth of extensible encodings whose short form is at most 8 bytes
pub const SMALL_GROWTH: u8 = 2;

/// Growth of extensible encodings whose short form exceeds 8 bytes
pub const LARGE_GROWTH: u8 = 4;

/// Raw encoding as written in the table: exact bits, short length, optional long length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingSpec {
    pub exact: u64,
    pub short_length: u8,
    pub long_length: Option<u8>,
}

impl EncodingSpec {
    /// Single-length encoding
    pub const fn fixed(exact: u64, length: u8) -> Self {
        Self {
            exact,
            short_length: length,
            long_length: None,
        }
    }

    /// Encoding with a compact and an extended form
    pub const fn extensible(exact: u64, short_length: u8, long_length: u8) -> Self {
        Self {
            exact,
            short_length,
            long_length: Some(long_length),
        }
    }
}

/// Validated encoding facts for one opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Encoding {
    exact: u64,
    short_length: u8,
    long_length: u8,
    extensible: bool,
}

/// Required growth between the short and long form
pub const fn growth_quantum(short_length: u8) -> u8 {
    if short_length > GROWTH_THRESHOLD {
        LARGE_GROWTH
    } else {
        SMALL_GROWTH
    }
}

impl Encoding {
    /// Build an encoding, checking the growth quantum when extensible
    ///
    /// A missing long length means the encoding is not extensible.
    pub fn new(exact: u64, short_length: u8, long_length: Option<u8>) -> Result<Self> {
        let long_length = long_length.unwrap_or(short_length);
        let extensible = short_length != long_length;

        if extensible {
            let expected = growth_quantum(short_length);
            if long_length.checked_sub(short_length) != Some(expected) {
                return Err(RegistryError::EncodingInvariant {
                    short_length,
                    long_length,
                    expected,
                });
            }
        }

        Ok(Self {
            exact,
            short_length,
            long_length,
            extensible,
        })
    }

    /// Exact bit pattern (base opcode value)
    pub const fn exact(&self) -> u64 {
        self.exact
    }

    /// Length in bytes of the compact form
    pub const fn short_length(&self) -> u8 {
        self.short_length
    }

    /// Length in bytes of the extended form; equals the short length when not extensible
    pub const fn long_length(&self) -> u8 {
        self.long_length
    }

    pub const fn extensible(&self) -> bool {
        self.extensible
    }
}

impl TryFrom<EncodingSpec> for Encoding {
    type Error = RegistryError;

    fn try_from(spec: EncodingSpec) -> Result<Self> {
        Encoding::new(spec.exact, spec.short_length, spec.long_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_length_is_not_extensible() {
        let enc = Encoding::new(0x0E, 8, None).unwrap();
        assert!(!enc.extensible());
        assert_eq!(enc.short_length(), 8);
        assert_eq!(enc.long_length(), 8);
    }

    #[test]
    fn equal_lengths_are_not_extensible() {
        let enc = Encoding::new(0x38, 2, Some(2)).unwrap();
        assert!(!enc.extensible());
    }

    #[test]
    fn small_forms_grow_by_two() {
        let enc = Encoding::new(0x2A, 4, Some(6)).unwrap();
        assert!(enc.extensible());
        assert_eq!(enc.long_length() - enc.short_length(), 2);

        Encoding::new(0x12, 8, Some(10)).unwrap();
    }

    #[test]
    fn large_forms_grow_by_four() {
        let enc = Encoding::new(0, 10, Some(14)).unwrap();
        assert!(enc.extensible());

        let err = Encoding::new(0, 10, Some(12)).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::EncodingInvariant {
                short_length: 10,
                long_length: 12,
                expected: 4
            }
        ));
    }

    #[test]
    fn wrong_growth_is_rejected() {
        assert!(Encoding::new(0x2A, 4, Some(8)).is_err());
        assert!(Encoding::new(0x2A, 6, Some(4)).is_err());
    }

    #[test]
    fn raw_form_conversion() {
        let enc = Encoding::try_from(EncodingSpec::extensible(0x3A, 6, 8)).unwrap();
        assert_eq!(enc.exact(), 0x3A);
        assert!(enc.extensible());

        let enc = Encoding::try_from(EncodingSpec::fixed(0x7E, 6)).unwrap();
        assert_eq!(enc.long_length(), 6);
    }
}
