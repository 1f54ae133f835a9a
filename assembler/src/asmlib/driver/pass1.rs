//! Pass 1 assigns an address to every statement, symbol and literal.
use tracing::{event, span, Level};

use base::prelude::{Address, Format, InstructionCatalog};

use super::super::ast::{InstructionOperand, TermValue, Token};
use super::super::directive::{self, Directive};
use super::super::lexer;
use super::super::parser;
use super::super::symbol::SymbolName;
use super::super::symtab::{ControlSection, LiteralTable, SymbolTable};
use super::super::types::{ErrorKind, ProgramError};

#[derive(Debug)]
pub(super) struct Pass1Output {
    pub(super) tokens: Vec<Token>,
    pub(super) symbols: SymbolTable,
    pub(super) literals: LiteralTable,
    pub(super) sections: Vec<ControlSection>,
}

struct Pass1<'a> {
    catalog: &'a InstructionCatalog,
    locctr: Address,
    symbols: SymbolTable,
    literals: LiteralTable,
    sections: Vec<ControlSection>,
    ended: bool,
}

impl Pass1<'_> {
    fn section_name(&self) -> SymbolName {
        self.sections
            .last()
            .map(|section| section.name.clone())
            .unwrap_or_default()
    }

    fn open_section(&mut self, name: SymbolName, start: Address) {
        event!(
            Level::DEBUG,
            "opening control section '{name}' at {start}"
        );
        let primary = self.sections.is_empty();
        self.sections.push(ControlSection::new(name, start, primary));
        self.locctr = start;
    }

    fn close_section(&mut self) {
        let end = self.locctr;
        if let Some(section) = self.sections.last_mut() {
            section.length = u32::from(end) - u32::from(section.start);
            event!(
                Level::DEBUG,
                "closing control section '{}' with length {:06X}",
                section.name,
                section.length
            );
        }
    }

    fn statement(&mut self, token: &mut Token) -> Result<(), ProgramError> {
        if token.operator.is_none() {
            return Ok(());
        }
        if self.ended {
            return Err(token.operator_error(ErrorKind::parse("statements may not follow END")));
        }
        let directive = Directive::lookup(token);
        match directive {
            Some(Directive::Start) => {
                if !self.sections.is_empty() {
                    return Err(token.operator_error(ErrorKind::parse(
                        "START must be the first statement of the program",
                    )));
                }
            }
            Some(Directive::Csect) => (),
            _ => {
                if self.sections.is_empty() {
                    self.open_section(SymbolName::default(), Address::ZERO);
                }
            }
        }
        let label_value = match directive {
            Some(d) => self.directive(d, token)?,
            None => self.instruction(token)?,
        };
        for operand in &token.operands {
            if let Some(body) = operand.strip_prefix('=') {
                let constant =
                    lexer::constant(body).map_err(|e| token.error(operand.as_str(), e))?;
                let section = self.section_name();
                self.literals.intern(operand, &section, constant);
            }
        }
        if let Some(label) = token.label.clone() {
            self.define(token, label, label_value)?;
        }
        Ok(())
    }

    fn define(
        &mut self,
        token: &Token,
        label: SymbolName,
        value: Address,
    ) -> Result<(), ProgramError> {
        let section = self.section_name();
        if self
            .sections
            .last()
            .is_some_and(|s| s.imports_symbol(&label))
        {
            return Err(token.error(
                label.to_string(),
                ErrorKind::parse(format!(
                    "{label} is imported by EXTREF so it cannot also be defined here"
                )),
            ));
        }
        self.symbols
            .define(label.clone(), value, section)
            .map_err(|previous| {
                token.error(
                    label.to_string(),
                    ErrorKind::parse(format!(
                        "{label} is already defined in this control section (with value {previous:X})"
                    )),
                )
            })
    }

    /// Process a directive, returning the value its label (if any)
    /// should have.
    fn directive(&mut self, directive: Directive, token: &mut Token) -> Result<Address, ProgramError> {
        directive.check_operands(token)?;
        if directive == Directive::Csect && token.label.is_none() {
            return Err(token.operator_error(ErrorKind::parse(
                "CSECT needs a label to name the control section",
            )));
        }
        let here = self.locctr;
        let pool_length = if directive.flushes_literals() {
            self.place_literal_pool(token)?
        } else {
            0
        };
        match directive {
            Directive::Start => {
                let start = directive.location_after(token, here, 0)?;
                let name = token.label.clone().unwrap_or_default();
                self.open_section(name, start);
                token.address = Some(start);
                return Ok(start);
            }
            Directive::Csect => {
                let name = token.label.clone().unwrap_or_default();
                self.locctr = directive::advance(token, here, pool_length)?;
                self.close_section();
                self.open_section(name, Address::ZERO);
                token.address = Some(Address::ZERO);
                return Ok(Address::ZERO);
            }
            Directive::Equ => {
                if token.label.is_none() {
                    return Err(token.operator_error(ErrorKind::parse(
                        "EQU needs a label to define",
                    )));
                }
                token.address = Some(here);
                return self.evaluate_equ(token);
            }
            Directive::Extdef | Directive::Extref => self.record_linkage(directive, token)?,
            Directive::Ltorg
            | Directive::End
            | Directive::Resb
            | Directive::Resw
            | Directive::Byte
            | Directive::Word => (),
        }
        token.address = Some(here);
        self.locctr = directive.location_after(token, here, pool_length)?;
        if directive == Directive::End {
            self.close_section();
            self.ended = true;
        }
        Ok(here)
    }

    fn record_linkage(&mut self, directive: Directive, token: &Token) -> Result<(), ProgramError> {
        let section_name = self.section_name();
        for operand in &token.operands {
            let name =
                parser::symbol_name(operand).map_err(|e| token.error(operand.as_str(), e))?;
            if directive == Directive::Extref
                && self.symbols.lookup(&name, &section_name).is_some()
            {
                return Err(token.error(
                    operand.as_str(),
                    ErrorKind::parse(format!(
                        "{name} is defined in this control section so it cannot be imported"
                    )),
                ));
            }
            if let Some(section) = self.sections.last_mut() {
                let names = if directive == Directive::Extdef {
                    &mut section.exports
                } else {
                    &mut section.imports
                };
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(())
    }

    /// Give every literal of the current section which does not yet
    /// have an address a place in the pool at the current location.
    /// Returns the size of the pool.
    fn place_literal_pool(&mut self, token: &mut Token) -> Result<u32, ProgramError> {
        let start = self.locctr;
        let mut cursor = start;
        for id in self.literals.unplaced(&self.section_name()) {
            if let Some(literal) = self.literals.get_mut(id) {
                literal.address = Some(cursor);
                event!(
                    Level::DEBUG,
                    "literal {} placed at {cursor}",
                    literal.text
                );
                cursor = directive::advance(token, cursor, literal.length())?;
                token.literal_pool.push(id);
            }
        }
        Ok(u32::from(cursor) - u32::from(start))
    }

    fn evaluate_equ(&self, token: &Token) -> Result<Address, ProgramError> {
        let operand = token.operands.first().map_or("", String::as_str);
        let expression = parser::expression(operand).map_err(|e| token.error(operand, e))?;
        let section = self.section_name();
        let mut value: i64 = 0;
        for term in &expression.terms {
            let term_value: i64 = match &term.value {
                TermValue::Number(n) => *n,
                TermValue::Here => i64::from(self.locctr),
                TermValue::Symbol(name) => self
                    .symbols
                    .lookup(name, &section)
                    .map(i64::from)
                    .ok_or_else(|| {
                        token.error(
                            name.to_string(),
                            ErrorKind::UnresolvedSymbol {
                                name: name.clone(),
                                section: section.clone(),
                            },
                        )
                    })?,
            };
            value = value
                .checked_add(term.sign.apply(term_value))
                .ok_or_else(|| token.error(operand, ErrorKind::overflow("EQU value is too large")))?;
        }
        Address::try_from(value).map_err(|e| {
            token.error(
                operand,
                ErrorKind::overflow(format!("EQU value {value} is not an address: {e}")),
            )
        })
    }

    fn instruction(&mut self, token: &mut Token) -> Result<Address, ProgramError> {
        let catalog = self.catalog;
        let Some(operator) = token.operator.clone() else {
            return Ok(self.locctr);
        };
        let spec = catalog.get(&operator.mnemonic).ok_or_else(|| {
            token.operator_error(ErrorKind::parse(format!("unknown operation {operator}")))
        })?;
        let format = if !operator.extended {
            spec.format
        } else if spec.allows_extended() {
            Format::Four
        } else {
            return Err(token.operator_error(ErrorKind::UnsupportedFormat {
                mnemonic: spec.mnemonic.clone(),
                format: Format::Four.number(),
            }));
        };
        let wrong_operand_count = || {
            token.error(
                token.operand_text(),
                ErrorKind::parse(format!(
                    "{} takes {} operand(s)",
                    spec.mnemonic, spec.operand_count
                )),
            )
        };
        let flags = match format {
            Format::One | Format::Two => {
                if token.operands.len() != usize::from(spec.operand_count) {
                    return Err(wrong_operand_count());
                }
                InstructionOperand::flags(None, format)
            }
            Format::Three | Format::Four => {
                let operand = parser::instruction_operand(&token.operands)
                    .map_err(|e| token.error(token.operand_text(), e))?;
                if operand.is_some() != (spec.operand_count > 0) {
                    return Err(wrong_operand_count());
                }
                InstructionOperand::flags(operand.as_ref(), format)
            }
        };
        let here = self.locctr;
        token.flags = flags;
        token.format = Some(format);
        token.address = Some(here);
        self.locctr = directive::advance(token, here, format.length())?;
        Ok(here)
    }
}

/// Run pass 1 over the whole program.
///
/// # Errors
///
/// The first problem found; nothing is returned for a program with
/// errors.
pub(super) fn assemble_pass1(
    mut tokens: Vec<Token>,
    catalog: &InstructionCatalog,
) -> Result<Pass1Output, ProgramError> {
    let span = span!(Level::ERROR, "pass 1");
    let _enter = span.enter();
    let mut pass = Pass1 {
        catalog,
        locctr: Address::ZERO,
        symbols: SymbolTable::new(),
        literals: LiteralTable::new(),
        sections: Vec::new(),
        ended: false,
    };
    for token in &mut tokens {
        pass.statement(token)?;
    }
    if !pass.sections.is_empty() && !pass.ended {
        let line = tokens.last().map_or(0, |t| t.line);
        return Err(ProgramError::new(
            line,
            "",
            ErrorKind::parse("the program has no END statement"),
        ));
    }
    event!(
        Level::DEBUG,
        "pass 1 found {} symbols, {} literals and {} control sections",
        pass.symbols.len(),
        pass.literals.len(),
        pass.sections.len()
    );
    Ok(Pass1Output {
        tokens,
        symbols: pass.symbols,
        literals: pass.literals,
        sections: pass.sections,
    })
}
