//! The data structures built from source statements: the statement
//! itself ([`Token`]) and the typed values its operands parse into.
use std::fmt::{self, Display, Formatter, Write};

use base::prelude::{Address, Format, Nixbpe};

use super::symbol::SymbolName;
use super::symtab::LiteralId;
use super::types::{ErrorKind, LineNumber, ProgramError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    pub(crate) fn apply(self, n: i64) -> i64 {
        match self {
            Sign::Plus => n,
            Sign::Minus => -n,
        }
    }
}

impl Display for Sign {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char(match self {
            Sign::Plus => '+',
            Sign::Minus => '-',
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantKind {
    /// `C'...'`: one byte per character.
    Character,
    /// `X'...'`: two hex digits per byte.
    Hex,
}

/// The value of a `BYTE` operand or of a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    pub kind: ConstantKind,
    /// The text between the quotes.
    pub body: String,
}

impl Constant {
    /// The number of bytes the constant occupies.
    #[must_use]
    pub fn length(&self) -> u32 {
        let n = match self.kind {
            ConstantKind::Character => self.body.len(),
            ConstantKind::Hex => self.body.len().div_ceil(2),
        };
        u32::try_from(n).unwrap_or(u32::MAX)
    }

    /// A hex constant with an odd number of digits gets a leading
    /// zero digit.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        match self.kind {
            ConstantKind::Character => self.body.bytes().collect(),
            ConstantKind::Hex => {
                let mut digits: Vec<u8> = self
                    .body
                    .chars()
                    .filter_map(|ch| ch.to_digit(16))
                    .filter_map(|d| u8::try_from(d).ok())
                    .collect();
                if digits.len() % 2 == 1 {
                    digits.insert(0, 0);
                }
                digits
                    .chunks(2)
                    .map(|pair| (pair[0] << 4) | pair[1])
                    .collect()
            }
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            ConstantKind::Character => 'C',
            ConstantKind::Hex => 'X',
        };
        write!(f, "{tag}'{}'", self.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Addressing {
    Simple,
    /// `#operand`
    Immediate,
    /// `@operand`
    Indirect,
}

/// The operand of a format 3 or format 4 instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operand {
    Numeric(i64),
    Symbol(SymbolName),
    /// The literal's full text, including the leading `=`.
    Literal(String),
    /// `SYMBOL,X`
    IndexedSymbol(SymbolName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InstructionOperand {
    pub(crate) addressing: Addressing,
    pub(crate) operand: Operand,
}

impl InstructionOperand {
    /// The addressing-mode flags for an instruction of the given
    /// format with this operand.
    pub(crate) fn flags(operand: Option<&InstructionOperand>, format: Format) -> Nixbpe {
        match format {
            Format::One | Format::Two => Nixbpe::NONE,
            Format::Three | Format::Four => {
                let mut flags = match operand.map(|op| op.addressing) {
                    None | Some(Addressing::Simple) => Nixbpe::SIMPLE,
                    Some(Addressing::Immediate) => Nixbpe::I,
                    Some(Addressing::Indirect) => Nixbpe::N,
                };
                if let Some(InstructionOperand {
                    operand: Operand::IndexedSymbol(_),
                    ..
                }) = operand
                {
                    flags |= Nixbpe::X;
                }
                if format == Format::Four {
                    flags |= Nixbpe::E;
                } else if operand.is_some_and(|op| !matches!(op.operand, Operand::Numeric(_))) {
                    flags |= Nixbpe::P;
                }
                flags
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TermValue {
    Number(i64),
    Symbol(SymbolName),
    /// `*`, the current location.
    Here,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Term {
    pub(crate) sign: Sign,
    pub(crate) value: TermValue,
}

/// A left-to-right chain of terms joined by `+` and `-`, as used by
/// `EQU` and `WORD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Expression {
    pub(crate) terms: Vec<Term>,
}

impl Expression {
    pub(crate) fn symbols(&self) -> impl Iterator<Item = (Sign, &SymbolName)> {
        self.terms.iter().filter_map(|term| match &term.value {
            TermValue::Symbol(name) => Some((term.sign, name)),
            TermValue::Number(_) | TermValue::Here => None,
        })
    }
}

/// The operation field of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub mnemonic: String,
    /// Set by a leading `+`, requesting format 4.
    pub extended: bool,
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.extended {
            f.write_char('+')?;
        }
        f.write_str(&self.mnemonic)
    }
}

/// One source statement.  The tokenizer fills in the fields taken
/// from the text; pass 1 fills in the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub line: LineNumber,
    pub label: Option<SymbolName>,
    pub operator: Option<Operator>,
    pub operands: Vec<String>,
    pub comment: Option<String>,
    /// Addressing-mode flags; only meaningful for format 3 and 4.
    pub flags: Nixbpe,
    /// Only set for machine instructions.
    pub format: Option<Format>,
    /// The location of the statement.
    pub address: Option<Address>,
    /// The literals placed by this statement (`LTORG` or `END`).
    pub literal_pool: Vec<LiteralId>,
}

impl Token {
    pub(crate) fn comment_only(line: LineNumber, comment: String) -> Token {
        Token {
            line,
            label: None,
            operator: None,
            operands: Vec::new(),
            comment: Some(comment),
            flags: Nixbpe::NONE,
            format: None,
            address: None,
            literal_pool: Vec::new(),
        }
    }

    pub(crate) fn error<S: Into<String>>(&self, offending: S, kind: ErrorKind) -> ProgramError {
        ProgramError::new(self.line, offending, kind)
    }

    /// An error blamed on the operator.
    pub(crate) fn operator_error(&self, kind: ErrorKind) -> ProgramError {
        let offending = self
            .operator
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        self.error(offending, kind)
    }

    /// The operand field as it would be written in the source.
    #[must_use]
    pub fn operand_text(&self) -> String {
        self.operands.join(",")
    }
}
