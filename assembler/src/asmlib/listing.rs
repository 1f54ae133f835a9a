use std::fmt::{self, Display, Formatter};

use base::prelude::Address;

use super::ast::Token;
use super::types::LineNumber;

/// The assembly listing: each statement beside its location and the
/// bytes it assembled to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    output: Vec<ListingLine>,
}

impl Listing {
    pub(crate) fn push_line(&mut self, line: ListingLine) {
        self.output.push(line);
    }

    pub fn lines(&self) -> impl Iterator<Item = &ListingLine> {
        self.output.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.output.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLine {
    pub line: LineNumber,
    pub address: Option<Address>,
    pub label: String,
    pub operator: String,
    pub operands: String,
    pub object_code: Vec<u8>,
}

impl ListingLine {
    pub(crate) fn new(token: &Token, object_code: Vec<u8>) -> ListingLine {
        ListingLine {
            line: token.line,
            address: token.address,
            label: token
                .label
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            operator: token
                .operator
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            operands: token.operand_text(),
            object_code,
        }
    }
}

impl Display for ListingLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}  ", self.line)?;
        match self.address {
            Some(address) => write!(f, "{:04X}", address.value())?,
            None => f.write_str("    ")?,
        }
        write!(
            f,
            "  {:<8}{:<8}{:<18}",
            self.label, self.operator, self.operands
        )?;
        for byte in &self.object_code {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl Display for Listing {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for line in &self.output {
            writeln!(f, "{}", line.to_string().trim_end())?;
        }
        Ok(())
    }
}
