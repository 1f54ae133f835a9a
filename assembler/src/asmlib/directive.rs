use base::prelude::Address;

use super::ast::Token;
use super::lexer;
use super::parser;
use super::types::{ErrorKind, ProgramError};

/// An assembler directive (as opposed to a machine instruction).
///
/// Both passes look directives up in the same table and compute the
/// location counter with [`Directive::location_after`], which is what
/// keeps the two passes in agreement about every address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Directive {
    Start,
    Csect,
    End,
    Extdef,
    Extref,
    Resb,
    Resw,
    Byte,
    Word,
    Equ,
    Ltorg,
}

const DIRECTIVES: [(&str, Directive); 11] = [
    ("START", Directive::Start),
    ("CSECT", Directive::Csect),
    ("END", Directive::End),
    ("EXTDEF", Directive::Extdef),
    ("EXTREF", Directive::Extref),
    ("RESB", Directive::Resb),
    ("RESW", Directive::Resw),
    ("BYTE", Directive::Byte),
    ("WORD", Directive::Word),
    ("EQU", Directive::Equ),
    ("LTORG", Directive::Ltorg),
];

/// SIC/XE words are 3 bytes long.
pub(crate) const WORD_LENGTH: u32 = 3;

impl Directive {
    /// Find the directive named by a statement's operator.  Directives
    /// cannot be extended, so `+WORD` is not a directive.
    pub(crate) fn lookup(token: &Token) -> Option<Directive> {
        let operator = token.operator.as_ref()?;
        if operator.extended {
            return None;
        }
        DIRECTIVES
            .iter()
            .find(|(name, _)| *name == operator.mnemonic)
            .map(|(_, directive)| *directive)
    }

    pub(crate) fn name(self) -> &'static str {
        DIRECTIVES
            .iter()
            .find(|(_, directive)| *directive == self)
            .map_or("?", |(name, _)| *name)
    }

    fn operand_limits(self) -> (usize, usize) {
        match self {
            Directive::Start | Directive::End => (0, 1),
            Directive::Csect | Directive::Ltorg => (0, 0),
            Directive::Extdef | Directive::Extref => (1, 3),
            Directive::Resb
            | Directive::Resw
            | Directive::Byte
            | Directive::Word
            | Directive::Equ => (1, 1),
        }
    }

    pub(crate) fn check_operands(self, token: &Token) -> Result<(), ProgramError> {
        let (min, max) = self.operand_limits();
        let n = token.operands.len();
        if n < min || n > max {
            let expected = if min == max {
                format!("{min}")
            } else {
                format!("{min} to {max}")
            };
            return Err(token.operator_error(ErrorKind::parse(format!(
                "{} takes {expected} operands but was given {n}",
                self.name()
            ))));
        }
        Ok(())
    }

    /// Whether this directive places the pending literal pool of the
    /// current section.  `CSECT` places it at the end of the section
    /// it closes.
    pub(crate) fn flushes_literals(self) -> bool {
        matches!(self, Directive::Ltorg | Directive::End | Directive::Csect)
    }

    /// The number of bytes the statement itself occupies.
    pub(crate) fn footprint(self, token: &Token) -> Result<u32, ProgramError> {
        let operand = token.operands.first().map_or("", String::as_str);
        let in_operand = |e: ErrorKind| token.error(operand, e);
        match self {
            Directive::Resb => parser::decimal_count(operand).map_err(in_operand),
            Directive::Resw => parser::decimal_count(operand)
                .map_err(in_operand)?
                .checked_mul(WORD_LENGTH)
                .ok_or_else(|| {
                    token.error(operand, ErrorKind::overflow("RESW reservation is too large"))
                }),
            Directive::Byte => lexer::constant(operand)
                .map(|c| c.length())
                .map_err(in_operand),
            Directive::Word => Ok(WORD_LENGTH),
            Directive::Start
            | Directive::Csect
            | Directive::End
            | Directive::Extdef
            | Directive::Extref
            | Directive::Equ
            | Directive::Ltorg => Ok(0),
        }
    }

    /// The location counter after this statement, given its value
    /// `here` before the statement.  `pool_length` is the total size
    /// of the literals placed by the statement.
    pub(crate) fn location_after(
        self,
        token: &Token,
        here: Address,
        pool_length: u32,
    ) -> Result<Address, ProgramError> {
        match self {
            Directive::Start => start_address(token),
            Directive::Csect => Ok(Address::ZERO),
            Directive::Resb | Directive::Resw | Directive::Byte | Directive::Word => {
                advance(token, here, self.footprint(token)?)
            }
            Directive::Ltorg | Directive::End => advance(token, here, pool_length),
            Directive::Extdef | Directive::Extref | Directive::Equ => Ok(here),
        }
    }
}

/// The operand of `START` is a hexadecimal address.
fn start_address(token: &Token) -> Result<Address, ProgramError> {
    let Some(operand) = token.operands.first() else {
        return Ok(Address::ZERO);
    };
    let n = u32::from_str_radix(operand, 16).map_err(|_| {
        token.error(
            operand.as_str(),
            ErrorKind::parse("the START address must be a hexadecimal number"),
        )
    })?;
    Address::try_from(n).map_err(|e| {
        token.error(
            operand.as_str(),
            ErrorKind::overflow(format!("START address {n:X}: {e}")),
        )
    })
}

/// Move the location counter `n` bytes forward.
pub(crate) fn advance(token: &Token, here: Address, n: u32) -> Result<Address, ProgramError> {
    here.checked_add(n).ok_or_else(|| {
        token.operator_error(ErrorKind::overflow(format!(
            "location counter {here} plus {n} bytes passes the end of memory ({})",
            Address::MAX
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::super::source::tokenize_line;
    use super::*;

    fn statement(text: &str) -> Token {
        match tokenize_line(1, text) {
            Ok(Some(token)) => token,
            other => panic!("test input {text:?} should be a statement, got {other:?}"),
        }
    }

    fn addr(n: u32) -> Address {
        Address::try_from(n).expect("test data should be in range")
    }

    fn after(text: &str, here: u32) -> Result<Address, ProgramError> {
        let token = statement(text);
        let directive = Directive::lookup(&token).expect("test input should be a directive");
        directive.location_after(&token, addr(here), 0)
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Directive::lookup(&statement("\tWORD\t3")), Some(Directive::Word));
        assert_eq!(Directive::lookup(&statement("\t+WORD\t3")), None);
        assert_eq!(Directive::lookup(&statement("\tLDA\t#3")), None);
        assert_eq!(Directive::Extref.name(), "EXTREF");
    }

    #[test]
    fn test_storage_directives() {
        assert_eq!(after("\tRESB\t4096", 0x33), Ok(addr(0x1033)));
        assert_eq!(after("\tRESW\t1", 0x2A), Ok(addr(0x2D)));
        assert_eq!(after("\tBYTE\tC'EOF'", 0), Ok(addr(3)));
        assert_eq!(after("\tBYTE\tX'F1'", 0x27), Ok(addr(0x28)));
        assert_eq!(after("\tBYTE\tX'F01'", 0), Ok(addr(2)));
        assert_eq!(after("\tWORD\tBUFEND-BUFFER", 0x28), Ok(addr(0x2B)));
        assert_eq!(after("\tEQU\t*", 0x1033), Ok(addr(0x1033)));
    }

    #[test]
    fn test_section_directives() {
        assert_eq!(after("COPY\tSTART\t1000", 0), Ok(addr(0x1000)));
        assert_eq!(after("COPY\tSTART", 0), Ok(addr(0)));
        assert_eq!(after("RDREC\tCSECT", 0x1033), Ok(addr(0)));
    }

    #[test]
    fn test_literal_pool_advances() {
        let token = statement("\tLTORG");
        assert_eq!(
            Directive::Ltorg.location_after(&token, addr(0x30), 3),
            Ok(addr(0x33))
        );
    }

    #[test]
    fn test_directives_which_flush_literals() {
        let flushing: Vec<Directive> = [
            Directive::Start,
            Directive::Csect,
            Directive::Extdef,
            Directive::Extref,
            Directive::Resb,
            Directive::Resw,
            Directive::Byte,
            Directive::Word,
            Directive::Equ,
            Directive::Ltorg,
            Directive::End,
        ]
        .into_iter()
        .filter(|d| d.flushes_literals())
        .collect();
        assert_eq!(
            flushing,
            vec![Directive::Csect, Directive::Ltorg, Directive::End]
        );
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            after("\tRESB\t2", 0xF_FFFF),
            Err(ProgramError {
                kind: ErrorKind::OverflowFailure(_),
                ..
            })
        ));
        assert!(matches!(
            after("P\tSTART\t100000", 0),
            Err(ProgramError {
                kind: ErrorKind::OverflowFailure(_),
                ..
            })
        ));
        assert!(matches!(
            after("P\tSTART\tXYZ", 0),
            Err(ProgramError {
                kind: ErrorKind::ParseFailure(_),
                ..
            })
        ));
    }

    #[test]
    fn test_operand_counts() {
        let token = statement("\tRESB");
        assert!(Directive::Resb.check_operands(&token).is_err());
        let token = statement("\tEXTREF\tA,B");
        assert!(Directive::Extref.check_operands(&token).is_ok());
        let token = statement("\tLTORG\tA");
        assert!(Directive::Ltorg.check_operands(&token).is_err());
    }
}
