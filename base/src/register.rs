use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

#[cfg(test)]
use test_strategy::{proptest, Arbitrary};

use super::error::{ConversionFailed, UnknownRegister};

/// The SIC/XE registers which may be named in a format-2
/// instruction.  The discriminant is the 4-bit code the register has
/// inside the instruction.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Register {
    A = 0,
    X = 1,
    L = 2,
    B = 3,
    S = 4,
    T = 5,
    F = 6,
}

impl Register {
    pub const ALL: [Register; 7] = [
        Register::A,
        Register::X,
        Register::L,
        Register::B,
        Register::S,
        Register::T,
        Register::F,
    ];

    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Register::A => "A",
            Register::X => "X",
            Register::L => "L",
            Register::B => "B",
            Register::S => "S",
            Register::T => "T",
            Register::F => "F",
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Register {
    type Err = UnknownRegister;

    fn from_str(s: &str) -> Result<Register, UnknownRegister> {
        Register::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| UnknownRegister(s.to_string()))
    }
}

impl TryFrom<u8> for Register {
    type Error = ConversionFailed;

    fn try_from(n: u8) -> Result<Register, ConversionFailed> {
        Register::ALL
            .get(usize::from(n))
            .copied()
            .ok_or(ConversionFailed::TooLarge)
    }
}

#[cfg(test)]
#[proptest]
fn register_code_is_bijective(reg: Register) {
    let code = reg.number();
    assert!(code <= 6);
    assert_eq!(Register::try_from(code), Ok(reg));
    assert_eq!(reg.name().parse::<Register>(), Ok(reg));
}

#[test]
fn test_register_codes() {
    let codes: Vec<u8> = Register::ALL.iter().map(|r| r.number()).collect();
    assert_eq!(codes, vec![0, 1, 2, 3, 4, 5, 6]);
    assert_eq!(Register::try_from(7_u8), Err(ConversionFailed::TooLarge));
    assert_eq!(
        "PC".parse::<Register>(),
        Err(UnknownRegister("PC".to_string()))
    );
}
