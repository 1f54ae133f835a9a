//! SIC/XE memory is byte-addressed, and a format-4 instruction can
//! hold a 20-bit address.  Addresses in this crate are therefore
//! limited to 20 bits; anything larger cannot be reached by any
//! instruction and is rejected at construction time.
use std::fmt::{self, Debug, Display, Formatter, UpperHex};

use super::error::ConversionFailed;

/// A location in SIC/XE memory (or an offset within a control
/// section, which is the same thing before linking).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u32);

impl Address {
    pub const ZERO: Address = Address(0);
    pub const MAX: Address = Address(0xF_FFFF);

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Advance an address by `n` bytes, returning `None` if the
    /// result would not fit into 20 bits.
    #[must_use]
    pub fn checked_add(self, n: u32) -> Option<Address> {
        match self.0.checked_add(n) {
            Some(sum) if sum <= Address::MAX.0 => Some(Address(sum)),
            _ => None,
        }
    }

    /// The signed distance from `origin` to `self`.
    #[must_use]
    pub fn distance_from(self, origin: Address) -> i64 {
        i64::from(self.0) - i64::from(origin.0)
    }
}

impl TryFrom<u32> for Address {
    type Error = ConversionFailed;
    fn try_from(n: u32) -> Result<Address, ConversionFailed> {
        if n > Address::MAX.0 {
            Err(ConversionFailed::TooLarge)
        } else {
            Ok(Address(n))
        }
    }
}

impl TryFrom<i64> for Address {
    type Error = ConversionFailed;
    fn try_from(n: i64) -> Result<Address, ConversionFailed> {
        match u32::try_from(n) {
            Ok(n) => Address::try_from(n),
            Err(_) if n < 0 => Err(ConversionFailed::TooSmall),
            Err(_) => Err(ConversionFailed::TooLarge),
        }
    }
}

impl From<Address> for u32 {
    fn from(a: Address) -> u32 {
        a.0
    }
}

impl From<Address> for i64 {
    fn from(a: Address) -> i64 {
        i64::from(a.0)
    }
}

/// Object records always show addresses as six hex digits.
impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

impl UpperHex for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        UpperHex::fmt(&self.0, f)
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:#X})", self.0)
    }
}
