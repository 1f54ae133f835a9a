//! Parsing of individual operands into typed values.
//!
//! Both assembler passes interpret operands through the functions in
//! this module, so they always agree on what an operand means.
use base::prelude::Register;

use super::ast::{Addressing, Expression, InstructionOperand, Operand, Sign, Term, TermValue};
use super::lexer::{self, Lexeme};
use super::symbol::SymbolName;
use super::types::ErrorKind;


/// Parse a label or an `EXTDEF`/`EXTREF` name.
pub(crate) fn symbol_name(text: &str) -> Result<SymbolName, ErrorKind> {
    match lexer::lex(text)?.as_slice() {
        [Lexeme::Name(name)] => Ok(SymbolName::from(name.as_str())),
        _ => Err(ErrorKind::parse(format!("'{text}' is not a valid symbol name"))),
    }
}

/// Parse a non-negative decimal count, as used by `RESB` and `RESW`.
pub(crate) fn decimal_count(text: &str) -> Result<u32, ErrorKind> {
    match lexer::lex(text)?.as_slice() {
        [Lexeme::Number(n)] => u32::try_from(*n)
            .map_err(|_| ErrorKind::overflow(format!("{n} is too large"))),
        _ => Err(ErrorKind::parse(format!("expected a decimal number but got '{text}'"))),
    }
}

/// Parse the operand list of a format 3 or format 4 instruction.
/// `None` means the instruction has no operand (as for `RSUB`).
pub(crate) fn instruction_operand(
    operands: &[String],
) -> Result<Option<InstructionOperand>, ErrorKind> {
    match operands {
        [] => Ok(None),
        [only] => single_operand(only, false).map(Some),
        [first, index] if index == "X" => single_operand(first, true).map(Some),
        [_, second] => Err(ErrorKind::parse(format!(
            "the only register allowed for indexing is X, not {second}"
        ))),
        _ => Err(ErrorKind::parse(
            "expected one operand, optionally followed by ,X",
        )),
    }
}

fn single_operand(text: &str, indexed: bool) -> Result<InstructionOperand, ErrorKind> {
    if let Some(body) = text.strip_prefix('=') {
        lexer::constant(body)?;
        if indexed {
            return Err(ErrorKind::parse("literals cannot be indexed"));
        }
        return Ok(InstructionOperand {
            addressing: Addressing::Simple,
            operand: Operand::Literal(text.to_string()),
        });
    }
    let lexemes = lexer::lex(text)?;
    let (addressing, rest) = match lexemes.as_slice() {
        [Lexeme::Hash, rest @ ..] => (Addressing::Immediate, rest),
        [Lexeme::At, rest @ ..] => (Addressing::Indirect, rest),
        rest => (Addressing::Simple, rest),
    };
    let operand = match (rest, indexed) {
        ([Lexeme::Number(n)], false) => Operand::Numeric(*n),
        ([Lexeme::Name(name)], false) => Operand::Symbol(SymbolName::from(name.as_str())),
        ([Lexeme::Name(name)], true) => {
            if addressing != Addressing::Simple {
                return Err(ErrorKind::parse(
                    "indexed addressing cannot be combined with # or @",
                ));
            }
            Operand::IndexedSymbol(SymbolName::from(name.as_str()))
        }
        ([Lexeme::Number(_)], true) => {
            return Err(ErrorKind::parse("indexed addressing needs a symbol operand"));
        }
        _ => {
            return Err(ErrorKind::parse(format!(
                "'{text}' is not a number, a symbol or a literal"
            )));
        }
    };
    Ok(InstructionOperand {
        addressing,
        operand,
    })
}

/// Parse a chain of terms joined by `+` or `-`.  The first term may
/// have a sign of its own.
pub(crate) fn expression(text: &str) -> Result<Expression, ErrorKind> {
    let mut terms = Vec::new();
    let mut sign = Sign::Plus;
    let mut expect_term = true;
    for (position, lexeme) in lexer::lex(text)?.into_iter().enumerate() {
        let value = match (expect_term, lexeme) {
            (true, Lexeme::Plus) if position == 0 => continue,
            (true, Lexeme::Minus) if position == 0 => {
                sign = Sign::Minus;
                continue;
            }
            (true, Lexeme::Number(n)) => TermValue::Number(n),
            (true, Lexeme::Name(name)) => TermValue::Symbol(SymbolName::from(name)),
            (true, Lexeme::Star) => TermValue::Here,
            (false, Lexeme::Plus) => {
                sign = Sign::Plus;
                expect_term = true;
                continue;
            }
            (false, Lexeme::Minus) => {
                sign = Sign::Minus;
                expect_term = true;
                continue;
            }
            (_, other) => {
                return Err(ErrorKind::parse(format!(
                    "unexpected {other:?} in expression '{text}'"
                )));
            }
        };
        terms.push(Term { sign, value });
        expect_term = false;
    }
    if expect_term {
        return Err(ErrorKind::parse(format!("incomplete expression '{text}'")));
    }
    Ok(Expression { terms })
}

/// The value of one field of a format 2 instruction.  Most format 2
/// instructions take register names, but `SVC` takes a number and
/// `SHIFTL`/`SHIFTR` take a shift count (which is encoded as one
/// less than the count).
pub(crate) fn register_field(mnemonic: &str, text: &str) -> Result<u8, ErrorKind> {
    if let Ok(register) = text.parse::<Register>() {
        return Ok(register.number());
    }
    match (mnemonic, lexer::lex(text)?.as_slice()) {
        ("SVC", [Lexeme::Number(n)]) => u8::try_from(*n)
            .ok()
            .filter(|n| *n < 16)
            .ok_or_else(|| ErrorKind::overflow(format!("SVC number {n} does not fit in 4 bits"))),
        ("SHIFTL" | "SHIFTR", [Lexeme::Number(n)]) => u8::try_from(*n)
            .ok()
            .filter(|n| (1..=16).contains(n))
            .map(|n| n - 1)
            .ok_or_else(|| ErrorKind::overflow(format!("shift count {n} is not between 1 and 16"))),
        _ => Err(ErrorKind::parse(format!("'{text}' is not a register name"))),
    }
}
