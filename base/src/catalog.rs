//! The instruction catalog maps a mnemonic to its format, opcode and
//! operand count.
//!
//! A catalog can be read from text with one instruction per line:
//!
//! ```text
//! LDA    3 00 1
//! CLEAR  2 B4 1
//! FIX    1 C4 0
//! ```
//!
//! The format is 1, 2 or 3.  Format 3 instructions may also be
//! assembled as format 4 by prefixing the mnemonic with `+`; that is
//! a property of the source statement, not of the catalog entry.
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use super::instruction::Format;

/// What the assembler needs to know about one machine instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionSpec {
    pub mnemonic: String,
    pub format: Format,
    pub opcode: u8,
    pub operand_count: u8,
}

impl InstructionSpec {
    /// Only format 3 instructions have a format 4 variant.
    #[must_use]
    pub fn allows_extended(&self) -> bool {
        self.format == Format::Three
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogError {
    WrongFieldCount {
        line: usize,
        found: usize,
    },
    BadFormat {
        line: usize,
        text: String,
    },
    BadOpcode {
        line: usize,
        text: String,
    },
    BadOperandCount {
        line: usize,
        text: String,
    },
    DuplicateMnemonic {
        line: usize,
        mnemonic: String,
    },
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::WrongFieldCount { line, found } => {
                write!(
                    f,
                    "line {line}: expected 4 fields (mnemonic, format, opcode, operand count) but found {found}"
                )
            }
            CatalogError::BadFormat { line, text } => {
                write!(f, "line {line}: '{text}' is not an instruction format (1, 2 or 3)")
            }
            CatalogError::BadOpcode { line, text } => {
                write!(f, "line {line}: '{text}' is not a hexadecimal opcode")
            }
            CatalogError::BadOperandCount { line, text } => {
                write!(f, "line {line}: '{text}' is not a valid operand count")
            }
            CatalogError::DuplicateMnemonic { line, mnemonic } => {
                write!(f, "line {line}: instruction {mnemonic} is already defined")
            }
        }
    }
}

impl Error for CatalogError {}

fn parse_catalog_line(line: usize, text: &str) -> Result<Option<InstructionSpec>, CatalogError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = text.split_whitespace().collect();
    let [mnemonic, format, opcode, operand_count] = fields.as_slice() else {
        return Err(CatalogError::WrongFieldCount {
            line,
            found: fields.len(),
        });
    };
    let format = match format.parse::<u8>() {
        Ok(n @ 1..=3) => Format::try_from(n).ok(),
        _ => None,
    }
    .ok_or_else(|| CatalogError::BadFormat {
        line,
        text: format.to_string(),
    })?;
    let opcode = u8::from_str_radix(opcode, 16).map_err(|_| CatalogError::BadOpcode {
        line,
        text: opcode.to_string(),
    })?;
    let operand_count = match operand_count.parse::<u8>() {
        Ok(n @ 0..=2) => Ok(n),
        _ => Err(CatalogError::BadOperandCount {
            line,
            text: operand_count.to_string(),
        }),
    }?;
    Ok(Some(InstructionSpec {
        mnemonic: mnemonic.to_string(),
        format,
        opcode,
        operand_count,
    }))
}

/// The standard SIC/XE instruction set: mnemonic, format, opcode and
/// operand count.
const STANDARD_INSTRUCTIONS: &[(&str, Format, u8, u8)] = &[
    ("ADD", Format::Three, 0x18, 1),
    ("ADDF", Format::Three, 0x58, 1),
    ("ADDR", Format::Two, 0x90, 2),
    ("AND", Format::Three, 0x40, 1),
    ("CLEAR", Format::Two, 0xB4, 1),
    ("COMP", Format::Three, 0x28, 1),
    ("COMPF", Format::Three, 0x88, 1),
    ("COMPR", Format::Two, 0xA0, 2),
    ("DIV", Format::Three, 0x24, 1),
    ("DIVF", Format::Three, 0x64, 1),
    ("DIVR", Format::Two, 0x9C, 2),
    ("FIX", Format::One, 0xC4, 0),
    ("FLOAT", Format::One, 0xC0, 0),
    ("HIO", Format::One, 0xF4, 0),
    ("J", Format::Three, 0x3C, 1),
    ("JEQ", Format::Three, 0x30, 1),
    ("JGT", Format::Three, 0x34, 1),
    ("JLT", Format::Three, 0x38, 1),
    ("JSUB", Format::Three, 0x48, 1),
    ("LDA", Format::Three, 0x00, 1),
    ("LDB", Format::Three, 0x68, 1),
    ("LDCH", Format::Three, 0x50, 1),
    ("LDF", Format::Three, 0x70, 1),
    ("LDL", Format::Three, 0x08, 1),
    ("LDS", Format::Three, 0x6C, 1),
    ("LDT", Format::Three, 0x74, 1),
    ("LDX", Format::Three, 0x04, 1),
    ("LPS", Format::Three, 0xD0, 1),
    ("MUL", Format::Three, 0x20, 1),
    ("MULF", Format::Three, 0x60, 1),
    ("MULR", Format::Two, 0x98, 2),
    ("NORM", Format::One, 0xC8, 0),
    ("OR", Format::Three, 0x44, 1),
    ("RD", Format::Three, 0xD8, 1),
    ("RMO", Format::Two, 0xAC, 2),
    ("RSUB", Format::Three, 0x4C, 0),
    ("SHIFTL", Format::Two, 0xA4, 2),
    ("SHIFTR", Format::Two, 0xA8, 2),
    ("SIO", Format::One, 0xF0, 0),
    ("SSK", Format::Three, 0xEC, 1),
    ("STA", Format::Three, 0x0C, 1),
    ("STB", Format::Three, 0x78, 1),
    ("STCH", Format::Three, 0x54, 1),
    ("STF", Format::Three, 0x80, 1),
    ("STI", Format::Three, 0xD4, 1),
    ("STL", Format::Three, 0x14, 1),
    ("STS", Format::Three, 0x7C, 1),
    ("STSW", Format::Three, 0xE8, 1),
    ("STT", Format::Three, 0x84, 1),
    ("STX", Format::Three, 0x10, 1),
    ("SUB", Format::Three, 0x1C, 1),
    ("SUBF", Format::Three, 0x5C, 1),
    ("SUBR", Format::Two, 0x94, 2),
    ("SVC", Format::Two, 0xB0, 1),
    ("TD", Format::Three, 0xE0, 1),
    ("TIO", Format::One, 0xF8, 0),
    ("TIX", Format::Three, 0x2C, 1),
    ("TIXR", Format::Two, 0xB8, 1),
    ("WD", Format::Three, 0xDC, 1),
];

/// A read-only lookup table of machine instructions, built once and
/// then shared by both assembler passes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstructionCatalog {
    by_mnemonic: BTreeMap<String, InstructionSpec>,
}

impl InstructionCatalog {
    /// The complete SIC/XE instruction set.
    #[must_use]
    pub fn standard() -> InstructionCatalog {
        InstructionCatalog {
            by_mnemonic: STANDARD_INSTRUCTIONS
                .iter()
                .map(|&(mnemonic, format, opcode, operand_count)| {
                    (
                        mnemonic.to_string(),
                        InstructionSpec {
                            mnemonic: mnemonic.to_string(),
                            format,
                            opcode,
                            operand_count,
                        },
                    )
                })
                .collect(),
        }
    }

    /// Parse a catalog from its text form (see the module
    /// documentation).  Blank lines and lines starting with `#` are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns the first malformed line.  A mnemonic defined twice is
    /// also an error.
    pub fn parse(text: &str) -> Result<InstructionCatalog, CatalogError> {
        let mut by_mnemonic = BTreeMap::new();
        for (line, item) in text.lines().enumerate().map(|(n, item)| (n + 1, item)) {
            if let Some(spec) = parse_catalog_line(line, item)? {
                if by_mnemonic.contains_key(&spec.mnemonic) {
                    return Err(CatalogError::DuplicateMnemonic {
                        line,
                        mnemonic: spec.mnemonic,
                    });
                }
                by_mnemonic.insert(spec.mnemonic.clone(), spec);
            }
        }
        Ok(InstructionCatalog { by_mnemonic })
    }

    /// Look up an instruction.  A leading `+` (the format 4 marker)
    /// is ignored.
    #[must_use]
    pub fn get(&self, mnemonic: &str) -> Option<&InstructionSpec> {
        let mnemonic = mnemonic.strip_prefix('+').unwrap_or(mnemonic);
        self.by_mnemonic.get(mnemonic)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_mnemonic.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_mnemonic.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstructionSpec> {
        self.by_mnemonic.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog() {
        let catalog = InstructionCatalog::parse(
            "# mnemonic format opcode operands\nLDA 3 00 1\n\n  CLEAR\t2\tB4\t1\nFIX 1 C4 0\n",
        )
        .expect("catalog should be valid");
        assert_eq!(catalog.len(), 3);
        let clear = catalog.get("CLEAR").expect("CLEAR should be present");
        assert_eq!(clear.format, Format::Two);
        assert_eq!(clear.opcode, 0xB4);
        assert_eq!(clear.operand_count, 1);
    }

    #[test]
    fn test_lookup_strips_extended_marker() {
        let catalog = InstructionCatalog::standard();
        let jsub = catalog.get("+JSUB").expect("JSUB should be present");
        assert_eq!(jsub.mnemonic, "JSUB");
        assert_eq!(jsub.opcode, 0x48);
        assert!(jsub.allows_extended());
        assert!(catalog.get("JSUBX").is_none());
    }

    #[test]
    fn test_standard_catalog_round_trips_through_text() {
        let standard = InstructionCatalog::standard();
        let text: String = standard
            .iter()
            .map(|spec| {
                format!(
                    "{} {} {:02X} {}\n",
                    spec.mnemonic, spec.format, spec.opcode, spec.operand_count
                )
            })
            .collect();
        assert_eq!(InstructionCatalog::parse(&text), Ok(standard));
    }

    #[test]
    fn test_catalog_errors() {
        assert_eq!(
            InstructionCatalog::parse("LDA 3 00"),
            Err(CatalogError::WrongFieldCount { line: 1, found: 3 })
        );
        assert_eq!(
            InstructionCatalog::parse("\nLDA 4 00 1"),
            Err(CatalogError::BadFormat {
                line: 2,
                text: "4".to_string()
            })
        );
        assert_eq!(
            InstructionCatalog::parse("LDA 3 G0 1"),
            Err(CatalogError::BadOpcode {
                line: 1,
                text: "G0".to_string()
            })
        );
        assert_eq!(
            InstructionCatalog::parse("LDA 3 00 1\nLDA 3 00 1"),
            Err(CatalogError::DuplicateMnemonic {
                line: 2,
                mnemonic: "LDA".to_string()
            })
        );
    }
}
