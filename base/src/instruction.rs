//! Binary and symbolic representations of SIC/XE instructions.
//!
//! SIC/XE has four instruction formats.  Formats 1 and 2 carry a
//! full 8-bit opcode:
//!
//! | Format | Byte 1 | Byte 2                 |
//! |--------|--------|------------------------|
//! | 1      | opcode |                        |
//! | 2      | opcode | r1 (4 bits), r2 (4 bits)|
//!
//! Formats 3 and 4 only use the top 6 bits of the opcode.  The
//! bottom two bits of the first byte are the `n` and `i` flags, and
//! the next four bits are `x`, `b`, `p` and `e`:
//!
//! | Format | opcode | n | i | x | b | p | e | operand               |
//! |--------|--------|---|---|---|---|---|---|-----------------------|
//! | 3      | 6 bits | 1 | 1 | 1 | 1 | 1 | 0 | 12-bit displacement   |
//! | 4      | 6 bits | 1 | 1 | 1 | 1 | 1 | 1 | 20-bit address        |
//!
//! The `e` bit is what distinguishes format 4 from format 3.

use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::ops::{BitOr, BitOrAssign};

#[cfg(test)]
use test_strategy::proptest;

use super::error::ConversionFailed;
use super::types::Address;

/// The format of an instruction, which also determines its length in
/// bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    One,
    Two,
    Three,
    Four,
}

impl Format {
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Format::One => 1,
            Format::Two => 2,
            Format::Three => 3,
            Format::Four => 4,
        }
    }

    /// Instruction length in bytes.
    #[must_use]
    pub const fn length(self) -> u32 {
        match self {
            Format::One => 1,
            Format::Two => 2,
            Format::Three => 3,
            Format::Four => 4,
        }
    }
}

impl TryFrom<u8> for Format {
    type Error = ConversionFailed;

    fn try_from(n: u8) -> Result<Format, ConversionFailed> {
        match n {
            0 => Err(ConversionFailed::TooSmall),
            1 => Ok(Format::One),
            2 => Ok(Format::Two),
            3 => Ok(Format::Three),
            4 => Ok(Format::Four),
            _ => Err(ConversionFailed::TooLarge),
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// The six addressing-mode flags of a format 3 or format 4
/// instruction.  The bit values match the position of each flag in
/// the 6-bit field, so that `N | I | P` has the value `0b110010`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Nixbpe(u8);

impl Nixbpe {
    pub const NONE: Nixbpe = Nixbpe(0);
    /// Indirect.
    pub const N: Nixbpe = Nixbpe(0b10_0000);
    /// Immediate.
    pub const I: Nixbpe = Nixbpe(0b01_0000);
    /// Indexed.
    pub const X: Nixbpe = Nixbpe(0b00_1000);
    /// Base-relative.
    pub const B: Nixbpe = Nixbpe(0b00_0100);
    /// PC-relative.
    pub const P: Nixbpe = Nixbpe(0b00_0010);
    /// Extended (format 4).
    pub const E: Nixbpe = Nixbpe(0b00_0001);
    /// Simple addressing: both `n` and `i` set.
    pub const SIMPLE: Nixbpe = Nixbpe(0b11_0000);

    #[must_use]
    pub const fn from_bits(bits: u8) -> Nixbpe {
        Nixbpe(bits & 0b11_1111)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Nixbpe) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn without(self, other: Nixbpe) -> Nixbpe {
        Nixbpe(self.0 & !other.0)
    }

    /// The `n` and `i` bits, as they appear in the bottom of the
    /// first instruction byte.
    const fn ni(self) -> u8 {
        self.0 >> 4
    }

    /// The `x`, `b`, `p` and `e` bits, as they appear in the top of
    /// the second instruction byte.
    const fn xbpe(self) -> u8 {
        (self.0 & 0b1111) << 4
    }
}

impl BitOr for Nixbpe {
    type Output = Nixbpe;

    fn bitor(self, rhs: Nixbpe) -> Nixbpe {
        Nixbpe(self.0 | rhs.0)
    }
}

impl BitOrAssign for Nixbpe {
    fn bitor_assign(&mut self, rhs: Nixbpe) {
        self.0 |= rhs.0;
    }
}

impl Display for Nixbpe {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:06b}", self.0)
    }
}

impl Debug for Nixbpe {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Nixbpe({:06b})", self.0)
    }
}

/// The smallest displacement a format-3 instruction can hold.
pub const DISPLACEMENT_MIN: i64 = -2048;
/// The largest displacement a format-3 instruction can hold.
pub const DISPLACEMENT_MAX: i64 = 2047;

/// Compute the 12-bit two's complement displacement from `next` (the
/// address of the following instruction) to `target`.  Returns `None`
/// when the distance cannot be represented.
#[must_use]
pub fn pc_relative_displacement(target: Address, next: Address) -> Option<u16> {
    let distance = target.distance_from(next);
    if (DISPLACEMENT_MIN..=DISPLACEMENT_MAX).contains(&distance) {
        u16::try_from(distance & 0xFFF).ok()
    } else {
        None
    }
}

/// Sign-extend a 12-bit displacement field.
#[must_use]
pub fn displacement_value(field: u16) -> i32 {
    let v = i32::from(field & 0xFFF);
    if v & 0x800 == 0 {
        v
    } else {
        v - 0x1000
    }
}

/// An instruction with all of its fields known.  Converting it to
/// bytes with [`MachineInstruction::bytes`] is the final step of
/// assembling an instruction; [`MachineInstruction::decode`] is the
/// inverse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MachineInstruction {
    Format1 {
        opcode: u8,
    },
    /// The register fields are 4-bit codes (see
    /// [`crate::prelude::Register`]); an absent register is 0.
    Format2 {
        opcode: u8,
        r1: u8,
        r2: u8,
    },
    Format3 {
        opcode: u8,
        flags: Nixbpe,
        displacement: u16,
    },
    Format4 {
        opcode: u8,
        flags: Nixbpe,
        address: u32,
    },
}

impl MachineInstruction {
    #[must_use]
    pub fn format(&self) -> Format {
        match self {
            MachineInstruction::Format1 { .. } => Format::One,
            MachineInstruction::Format2 { .. } => Format::Two,
            MachineInstruction::Format3 { .. } => Format::Three,
            MachineInstruction::Format4 { .. } => Format::Four,
        }
    }

    /// Encode the instruction.  Fields wider than their slot in the
    /// instruction are truncated; callers are expected to have range
    /// checked them already.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        match *self {
            MachineInstruction::Format1 { opcode } => vec![opcode],
            MachineInstruction::Format2 { opcode, r1, r2 } => {
                vec![opcode, ((r1 & 0xF) << 4) | (r2 & 0xF)]
            }
            MachineInstruction::Format3 {
                opcode,
                flags,
                displacement,
            } => {
                let [hi, lo] = displacement.to_be_bytes();
                let flags = flags.without(Nixbpe::E);
                vec![(opcode & 0xFC) | flags.ni(), flags.xbpe() | (hi & 0xF), lo]
            }
            MachineInstruction::Format4 {
                opcode,
                flags,
                address,
            } => {
                let [_, top, mid, low] = address.to_be_bytes();
                let flags = flags | Nixbpe::E;
                vec![
                    (opcode & 0xFC) | flags.ni(),
                    flags.xbpe() | (top & 0xF),
                    mid,
                    low,
                ]
            }
        }
    }

    /// Decode an instruction from exactly the bytes it occupies.
    ///
    /// # Errors
    ///
    /// Fails when the length of `bytes` is not 1 to 4, or when the
    /// `e` flag contradicts the length.
    pub fn decode(bytes: &[u8]) -> Result<MachineInstruction, DisassemblyFailure> {
        match *bytes {
            [opcode] => Ok(MachineInstruction::Format1 { opcode }),
            [opcode, regs] => Ok(MachineInstruction::Format2 {
                opcode,
                r1: regs >> 4,
                r2: regs & 0xF,
            }),
            [b1, b2, b3] => {
                let flags = Nixbpe::from_bits(((b1 & 0b11) << 4) | (b2 >> 4));
                if flags.contains(Nixbpe::E) {
                    return Err(DisassemblyFailure::ExtendedFlagMismatch(Format::Three));
                }
                Ok(MachineInstruction::Format3 {
                    opcode: b1 & 0xFC,
                    flags,
                    displacement: u16::from_be_bytes([b2 & 0xF, b3]),
                })
            }
            [b1, b2, b3, b4] => {
                let flags = Nixbpe::from_bits(((b1 & 0b11) << 4) | (b2 >> 4));
                if !flags.contains(Nixbpe::E) {
                    return Err(DisassemblyFailure::ExtendedFlagMismatch(Format::Four));
                }
                Ok(MachineInstruction::Format4 {
                    opcode: b1 & 0xFC,
                    flags,
                    address: u32::from_be_bytes([0, b2 & 0xF, b3, b4]),
                })
            }
            _ => Err(DisassemblyFailure::BadLength(bytes.len())),
        }
    }
}

/// Signals that a byte sequence could not be converted to a
/// [`MachineInstruction`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisassemblyFailure {
    /// No SIC/XE instruction has this many bytes.
    BadLength(usize),
    /// The `e` flag says the instruction has the other length.
    ExtendedFlagMismatch(Format),
}

impl Display for DisassemblyFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DisassemblyFailure::BadLength(n) => {
                write!(f, "no instruction is {n} bytes long")
            }
            DisassemblyFailure::ExtendedFlagMismatch(format) => {
                write!(
                    f,
                    "the e flag is inconsistent with a format {format} instruction"
                )
            }
        }
    }
}

impl Error for DisassemblyFailure {}

#[cfg(test)]
#[proptest]
fn reversible_format3_disassembly(
    #[strategy(0u8..64)] opcode6: u8,
    #[strategy(0u8..32)] nixbp: u8,
    #[strategy(0u16..4096)] displacement: u16,
) {
    let input = MachineInstruction::Format3 {
        opcode: opcode6 << 2,
        flags: Nixbpe::from_bits(nixbp << 1),
        displacement,
    };
    let bytes = input.bytes();
    assert_eq!(bytes.len(), 3);
    assert_eq!(MachineInstruction::decode(&bytes), Ok(input));
}

#[cfg(test)]
#[proptest]
fn reversible_format4_disassembly(
    #[strategy(0u8..64)] opcode6: u8,
    #[strategy(0u8..32)] nixbp: u8,
    #[strategy(0u32..0x10_0000)] address: u32,
) {
    let input = MachineInstruction::Format4 {
        opcode: opcode6 << 2,
        flags: Nixbpe::from_bits(nixbp << 1) | Nixbpe::E,
        address,
    };
    let bytes = input.bytes();
    assert_eq!(bytes.len(), 4);
    assert_eq!(MachineInstruction::decode(&bytes), Ok(input));
}

#[cfg(test)]
#[proptest]
fn pc_relative_displacement_reaches_target(
    #[strategy(0u32..0x10_0000)] next: u32,
    #[strategy(-2048i64..=2047)] distance: i64,
) {
    let next = Address::try_from(next).expect("test data should be in range");
    if let Ok(target) = Address::try_from(i64::from(next) + distance) {
        let field = pc_relative_displacement(target, next)
            .expect("distance within range should be representable");
        let recovered = i64::from(next) + i64::from(displacement_value(field));
        assert_eq!(recovered, i64::from(target));
    }
}
