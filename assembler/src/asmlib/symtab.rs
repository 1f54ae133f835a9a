//! The tables built by pass 1: symbols, literals and control
//! sections.
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use base::prelude::Address;

use super::ast::{Constant, ConstantKind};
use super::symbol::SymbolName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: SymbolName,
    pub address: Address,
    /// The control section the symbol belongs to.
    pub section: SymbolName,
}

/// Symbols are scoped by control section: the same name may be
/// defined once in each section, and a lookup in one section never
/// finds another section's symbol.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<(SymbolName, SymbolName), usize>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Define `name` in `section`.  If it is already defined there,
    /// return the existing definition's address.
    pub(crate) fn define(
        &mut self,
        name: SymbolName,
        address: Address,
        section: SymbolName,
    ) -> Result<(), Address> {
        let key = (name, section);
        if let Some(&pos) = self.index.get(&key) {
            return Err(self.symbols[pos].address);
        }
        let (name, section) = key.clone();
        self.index.insert(key, self.symbols.len());
        self.symbols.push(Symbol {
            name,
            address,
            section,
        });
        Ok(())
    }

    #[must_use]
    pub fn lookup(&self, name: &SymbolName, section: &SymbolName) -> Option<Address> {
        self.index
            .get(&(name.clone(), section.clone()))
            .map(|&pos| self.symbols[pos].address)
    }

    /// Symbols in the order in which they were defined.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// The symbol table dump: one line per symbol.
impl Display for SymbolTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            writeln!(
                f,
                "{}\t{:X}\t{}",
                symbol.name, symbol.address, symbol.section
            )?;
        }
        Ok(())
    }
}

/// Identifies an entry in the [`LiteralTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LiteralId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    /// The literal exactly as written, for example `=C'EOF'`.
    pub text: String,
    /// The control section using the literal.
    pub section: SymbolName,
    pub constant: Constant,
    /// Unassigned until the literal pool containing it is placed.
    pub address: Option<Address>,
    /// Set once the literal's bytes have been emitted.
    pub processed: bool,
}

impl Literal {
    #[must_use]
    pub fn kind(&self) -> ConstantKind {
        self.constant.kind
    }

    #[must_use]
    pub fn length(&self) -> u32 {
        self.constant.length()
    }
}

/// Literals are identified by their exact text within a control
/// section, so two uses of `=X'05'` in one section share one entry
/// (and one location), while another section gets its own.
#[derive(Debug, Clone, Default)]
pub struct LiteralTable {
    literals: Vec<Literal>,
}

impl LiteralTable {
    #[must_use]
    pub fn new() -> LiteralTable {
        LiteralTable::default()
    }

    /// Add a literal unless the section already has one with the same
    /// text.
    pub(crate) fn intern(
        &mut self,
        text: &str,
        section: &SymbolName,
        constant: Constant,
    ) -> LiteralId {
        match self.position(text, section) {
            Some(pos) => LiteralId(pos),
            None => {
                self.literals.push(Literal {
                    text: text.to_string(),
                    section: section.clone(),
                    constant,
                    address: None,
                    processed: false,
                });
                LiteralId(self.literals.len() - 1)
            }
        }
    }

    fn position(&self, text: &str, section: &SymbolName) -> Option<usize> {
        self.literals
            .iter()
            .position(|lit| lit.text == text && lit.section == *section)
    }

    #[must_use]
    pub fn find(&self, text: &str, section: &SymbolName) -> Option<&Literal> {
        self.position(text, section).map(|pos| &self.literals[pos])
    }

    #[must_use]
    pub fn get(&self, id: LiteralId) -> Option<&Literal> {
        self.literals.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: LiteralId) -> Option<&mut Literal> {
        self.literals.get_mut(id.0)
    }

    /// The literals of `section` not yet placed in a pool, in table
    /// order.
    pub(crate) fn unplaced(&self, section: &SymbolName) -> Vec<LiteralId> {
        self.literals
            .iter()
            .enumerate()
            .filter(|(_, lit)| lit.address.is_none() && lit.section == *section)
            .map(|(pos, _)| LiteralId(pos))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.literals.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

/// The literal table dump: one line per literal.
impl Display for LiteralTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for literal in &self.literals {
            match literal.address {
                Some(address) => writeln!(f, "{}\t{:X}", literal.text, address)?,
                None => writeln!(f, "{}\t-", literal.text)?,
            }
        }
        Ok(())
    }
}

/// An independently relocatable block of code and data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSection {
    pub name: SymbolName,
    pub start: Address,
    /// Only known once the section has been closed.
    pub length: u32,
    /// The section opened by `START` (or the implicit section of a
    /// program without `START`).  Only this section's End record
    /// carries an execution address.
    pub primary: bool,
    /// Names listed by `EXTDEF`.
    pub exports: Vec<SymbolName>,
    /// Names listed by `EXTREF`.
    pub imports: Vec<SymbolName>,
}

impl ControlSection {
    pub(crate) fn new(name: SymbolName, start: Address, primary: bool) -> ControlSection {
        ControlSection {
            name,
            start,
            length: 0,
            primary,
            exports: Vec::new(),
            imports: Vec::new(),
        }
    }

    #[must_use]
    pub fn imports_symbol(&self, name: &SymbolName) -> bool {
        self.imports.contains(name)
    }
}
