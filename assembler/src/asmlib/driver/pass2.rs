//! Pass 2 encodes every statement, now that every address is known.
use tracing::{event, span, Level};

use base::prelude::{
    pc_relative_displacement, Address, Format, InstructionCatalog, InstructionSpec,
    MachineInstruction,
};

use super::super::ast::{Operand, Sign, TermValue, Token};
use super::super::directive::{self, Directive};
use super::super::lexer;
use super::super::listing::{Listing, ListingLine};
use super::super::object::{Modification, ObjectModule, ObjectRecord, TextRecordBuilder};
use super::super::parser;
use super::super::symbol::SymbolName;
use super::super::symtab::{ControlSection, LiteralTable, SymbolTable};
use super::super::types::{ErrorKind, ProgramError};

/// The largest value of a format 3 address field.
const FORMAT3_FIELD_MAX: u32 = 0xFFF;
/// The largest value of a format 4 address field.
const FORMAT4_FIELD_MAX: u32 = 0xF_FFFF;
/// The range of values a WORD can hold, signed or unsigned.
const WORD_MIN: i64 = -(1 << 23);
const WORD_MAX: i64 = (1 << 24) - 1;

#[derive(Debug)]
pub(super) struct Pass2Output {
    pub(super) object: ObjectModule,
    pub(super) listing: Listing,
}

/// How a name used in an operand resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Local(Address),
    /// Imported with EXTREF; the linker supplies the address.
    External,
}

struct Pass2<'a> {
    catalog: &'a InstructionCatalog,
    symbols: &'a SymbolTable,
    sections: &'a [ControlSection],
    literals: &'a mut LiteralTable,
    /// The address for the primary section's End record.
    entry: Option<Address>,
    section: Option<usize>,
    locctr: Address,
    text: TextRecordBuilder,
    object: ObjectModule,
    listing: Listing,
}

impl<'a> Pass2<'a> {
    fn current_section(&self, token: &Token) -> Result<&'a ControlSection, ProgramError> {
        let sections: &'a [ControlSection] = self.sections;
        self.section
            .and_then(|index| sections.get(index))
            .ok_or_else(|| {
                token.operator_error(ErrorKind::parse(
                    "statement is not inside any control section",
                ))
            })
    }

    fn open_next_section(&mut self, token: &Token) -> Result<(), ProgramError> {
        self.close_section();
        let index = self.section.map_or(0, |i| i + 1);
        self.section = Some(index);
        let section = self.current_section(token)?;
        self.locctr = section.start;
        self.object.add(
            index,
            ObjectRecord::Header {
                name: section.name.clone(),
                start: section.start,
                length: section.length,
            },
        );
        Ok(())
    }

    fn close_section(&mut self) {
        let Some(index) = self.section else {
            return;
        };
        if let Some(record) = self.text.finish() {
            self.object.add(index, ObjectRecord::Text(record));
        }
        let primary = self.sections.get(index).is_some_and(|s| s.primary);
        self.object
            .add(index, ObjectRecord::End(if primary { self.entry } else { None }));
    }

    fn emit(&mut self, address: Address, bytes: &[u8]) {
        if let Some(index) = self.section {
            for record in self.text.push(address, bytes) {
                self.object.add(index, ObjectRecord::Text(record));
            }
        }
    }

    fn modification(&mut self, address: Address, half_bytes: u8, sign: Sign, symbol: &SymbolName) {
        if let Some(index) = self.section {
            self.object.add(
                index,
                ObjectRecord::Modification(Modification {
                    address,
                    half_bytes,
                    sign,
                    symbol: symbol.clone(),
                }),
            );
        }
    }

    fn resolve(&self, token: &Token, name: &SymbolName) -> Result<Resolution, ProgramError> {
        let section = self.current_section(token)?;
        if let Some(address) = self.symbols.lookup(name, &section.name) {
            Ok(Resolution::Local(address))
        } else if section.imports_symbol(name) {
            Ok(Resolution::External)
        } else {
            Err(token.error(
                name.to_string(),
                ErrorKind::UnresolvedSymbol {
                    name: name.clone(),
                    section: section.name.clone(),
                },
            ))
        }
    }

    fn statement(&mut self, token: &Token) -> Result<(), ProgramError> {
        if token.operator.is_none() {
            return Ok(());
        }
        let directive = Directive::lookup(token);
        // CSECT places the pool at the end of the section it closes,
        // so the pool is emitted before the next section opens.
        let (mut code, pool_length) = match directive {
            Some(d) if d.flushes_literals() => self.emit_literal_pool(token),
            _ => (Vec::new(), 0),
        };
        if matches!(directive, Some(Directive::Start | Directive::Csect)) || self.section.is_none()
        {
            self.open_next_section(token)?;
        }
        let here = self.locctr;
        debug_assert_eq!(
            token.address,
            Some(here),
            "pass 1 and pass 2 disagree about the address of line {}",
            token.line
        );
        let (body, next) = match directive {
            Some(d) => self.directive(d, token, here, pool_length)?,
            None => self.instruction(token, here)?,
        };
        code.extend(body);
        self.locctr = next;
        self.listing.push_line(ListingLine::new(token, code));
        if directive == Some(Directive::End) {
            self.close_section();
            self.section = None;
        }
        Ok(())
    }

    /// Emit the literals pass 1 placed in the pool of this statement.
    /// Returns their bytes and the size of the pool.
    fn emit_literal_pool(&mut self, token: &Token) -> (Vec<u8>, u32) {
        let mut code = Vec::new();
        let mut pool_length = 0;
        for &id in &token.literal_pool {
            let Some(literal) = self.literals.get_mut(id) else {
                continue;
            };
            if literal.processed {
                continue;
            }
            literal.processed = true;
            let bytes = literal.constant.bytes();
            pool_length += literal.length();
            let address = literal.address;
            if let Some(address) = address {
                self.emit(address, &bytes);
            }
            code.extend(bytes);
        }
        (code, pool_length)
    }

    /// Returns the bytes the directive assembled to and the location
    /// following it.
    fn directive(
        &mut self,
        directive: Directive,
        token: &Token,
        here: Address,
        pool_length: u32,
    ) -> Result<(Vec<u8>, Address), ProgramError> {
        let mut code = Vec::new();
        match directive {
            Directive::Start
            | Directive::Csect
            | Directive::Equ
            | Directive::Resb
            | Directive::Resw
            | Directive::Ltorg
            | Directive::End => (),
            Directive::Extdef => self.export(token)?,
            Directive::Extref => self.import(token)?,
            Directive::Byte => {
                let operand = token.operands.first().map_or("", String::as_str);
                code = lexer::constant(operand)
                    .map_err(|e| token.error(operand, e))?
                    .bytes();
                self.emit(here, &code);
            }
            Directive::Word => {
                code = self.word(token, here)?;
                self.emit(here, &code);
            }
        }
        let next = directive.location_after(token, here, pool_length)?;
        Ok((code, next))
    }

    /// The Define record lists every name the section's EXTDEF
    /// statements export.
    fn export(&mut self, token: &Token) -> Result<(), ProgramError> {
        let section = self.current_section(token)?;
        let mut exported = Vec::with_capacity(section.exports.len());
        for name in &section.exports {
            let address = self.symbols.lookup(name, &section.name).ok_or_else(|| {
                token.error(
                    name.to_string(),
                    ErrorKind::UnresolvedSymbol {
                        name: name.clone(),
                        section: section.name.clone(),
                    },
                )
            })?;
            exported.push((name.clone(), address));
        }
        if let Some(index) = self.section {
            self.object.add(index, ObjectRecord::Define(exported));
        }
        Ok(())
    }

    fn import(&mut self, token: &Token) -> Result<(), ProgramError> {
        let section = self.current_section(token)?;
        if let Some(index) = self.section {
            self.object
                .add(index, ObjectRecord::Reference(section.imports.clone()));
        }
        Ok(())
    }

    fn word(&mut self, token: &Token, here: Address) -> Result<Vec<u8>, ProgramError> {
        let operand = token.operands.first().map_or("", String::as_str);
        let expression = parser::expression(operand).map_err(|e| token.error(operand, e))?;
        let mut value: i64 = 0;
        let mut external = false;
        for term in &expression.terms {
            let term_value = match &term.value {
                TermValue::Number(n) => *n,
                TermValue::Here => i64::from(here),
                TermValue::Symbol(name) => match self.resolve(token, name)? {
                    Resolution::Local(address) => i64::from(address),
                    Resolution::External => {
                        external = true;
                        0
                    }
                },
            };
            value = value
                .checked_add(term.sign.apply(term_value))
                .ok_or_else(|| token.error(operand, ErrorKind::overflow("WORD value is too large")))?;
        }
        if !(WORD_MIN..=WORD_MAX).contains(&value) {
            return Err(token.error(
                operand,
                ErrorKind::overflow(format!("{value} does not fit into a 3-byte word")),
            ));
        }
        let symbol_terms: Vec<(Sign, &SymbolName)> = expression.symbols().collect();
        if symbol_terms.len() > 1 || external {
            for (sign, name) in symbol_terms {
                self.modification(here, 6, sign, name);
            }
        }
        let [.., high, middle, low] = value.rem_euclid(1 << 24).to_be_bytes();
        Ok(vec![high, middle, low])
    }

    fn instruction(
        &mut self,
        token: &Token,
        here: Address,
    ) -> Result<(Vec<u8>, Address), ProgramError> {
        let catalog = self.catalog;
        let mnemonic = token
            .operator
            .as_ref()
            .map_or("", |operator| operator.mnemonic.as_str());
        let spec = catalog.get(mnemonic).ok_or_else(|| {
            token.operator_error(ErrorKind::parse(format!("unknown operation {mnemonic}")))
        })?;
        let Some(format) = token.format else {
            return Err(token.operator_error(ErrorKind::UnsupportedFormat {
                mnemonic: spec.mnemonic.clone(),
                format: spec.format.number(),
            }));
        };
        let next = directive::advance(token, here, format.length())?;
        let instruction = match format {
            Format::One => MachineInstruction::Format1 {
                opcode: spec.opcode,
            },
            Format::Two => {
                let mut fields = [0_u8; 2];
                for (field, text) in fields.iter_mut().zip(&token.operands) {
                    *field = parser::register_field(&spec.mnemonic, text)
                        .map_err(|e| token.error(text.as_str(), e))?;
                }
                MachineInstruction::Format2 {
                    opcode: spec.opcode,
                    r1: fields[0],
                    r2: fields[1],
                }
            }
            Format::Three | Format::Four => {
                self.memory_reference(token, spec, format, here, next)?
            }
        };
        let code = instruction.bytes();
        event!(
            Level::TRACE,
            "line {}: {} at {here} assembled to {code:02X?}",
            token.line,
            spec.mnemonic
        );
        self.emit(here, &code);
        Ok((code, next))
    }

    /// The address field of a format 3 or 4 instruction which refers
    /// to `target`.
    fn address_field(
        token: &Token,
        format: Format,
        target: Address,
        next: Address,
    ) -> Result<u32, ProgramError> {
        if format == Format::Four {
            return Ok(u32::from(target));
        }
        pc_relative_displacement(target, next)
            .map(u32::from)
            .ok_or_else(|| {
                token.error(
                    token.operand_text(),
                    ErrorKind::overflow(format!(
                        "{target} is too far from {next} to be reached with a PC-relative displacement"
                    )),
                )
            })
    }

    fn memory_reference(
        &mut self,
        token: &Token,
        spec: &InstructionSpec,
        format: Format,
        here: Address,
        next: Address,
    ) -> Result<MachineInstruction, ProgramError> {
        let operand_text = token.operand_text();
        let operand =
            parser::instruction_operand(&token.operands).map_err(|e| token.error(&operand_text, e))?;
        let (field, relocated): (u32, Option<&SymbolName>) =
            match operand.as_ref().map(|op| &op.operand) {
                None => (0, None),
                Some(Operand::Numeric(n)) => {
                    let limit = if format == Format::Four {
                        FORMAT4_FIELD_MAX
                    } else {
                        FORMAT3_FIELD_MAX
                    };
                    let field = u32::try_from(*n)
                        .ok()
                        .filter(|v| *v <= limit)
                        .ok_or_else(|| {
                            token.error(
                                &operand_text,
                                ErrorKind::overflow(format!(
                                    "{n} does not fit into the address field of a format {format} instruction"
                                )),
                            )
                        })?;
                    (field, None)
                }
                Some(Operand::Literal(text)) => {
                    let section = self.current_section(token)?;
                    let target = self
                        .literals
                        .find(text, &section.name)
                        .and_then(|literal| literal.address)
                        .ok_or_else(|| {
                            token.error(
                                text.as_str(),
                                ErrorKind::parse(format!("literal {text} was never placed")),
                            )
                        })?;
                    (Self::address_field(token, format, target, next)?, None)
                }
                Some(Operand::Symbol(name) | Operand::IndexedSymbol(name)) => {
                    match self.resolve(token, name)? {
                        Resolution::Local(target) => {
                            (Self::address_field(token, format, target, next)?, Some(name))
                        }
                        Resolution::External if format == Format::Four => (0, Some(name)),
                        Resolution::External => {
                            let section = self.current_section(token)?;
                            return Err(token.error(
                                name.to_string(),
                                ErrorKind::UnresolvedSymbol {
                                    name: name.clone(),
                                    section: section.name.clone(),
                                },
                            ));
                        }
                    }
                }
            };
        if format == Format::Four {
            if let Some(name) = relocated {
                let field_address = directive::advance(token, here, 1)?;
                self.modification(field_address, 5, Sign::Plus, name);
            }
            Ok(MachineInstruction::Format4 {
                opcode: spec.opcode,
                flags: token.flags,
                address: field,
            })
        } else {
            let displacement = u16::try_from(field).map_err(|_| {
                token.error(
                    &operand_text,
                    ErrorKind::overflow("displacement does not fit into 12 bits"),
                )
            })?;
            Ok(MachineInstruction::Format3 {
                opcode: spec.opcode,
                flags: token.flags,
                displacement,
            })
        }
    }
}

/// Find the address at which execution starts: the operand of END,
/// looked up in the primary section, or else the start of the
/// primary section.
fn resolve_entry(
    tokens: &[Token],
    symbols: &SymbolTable,
    sections: &[ControlSection],
) -> Result<Option<Address>, ProgramError> {
    let Some(primary) = sections.iter().find(|s| s.primary) else {
        return Ok(None);
    };
    let end_operand = tokens
        .iter()
        .filter(|token| Directive::lookup(token) == Some(Directive::End))
        .find_map(|token| token.operands.first().map(|operand| (token, operand)));
    let Some((token, operand)) = end_operand else {
        return Ok(Some(primary.start));
    };
    let name = parser::symbol_name(operand).map_err(|e| token.error(operand.as_str(), e))?;
    match symbols.lookup(&name, &primary.name) {
        Some(address) => Ok(Some(address)),
        None => Err(token.error(
            operand.as_str(),
            ErrorKind::UnresolvedSymbol {
                name,
                section: primary.name.clone(),
            },
        )),
    }
}

/// Run pass 2 over the statements annotated by pass 1.
///
/// # Errors
///
/// The first statement which cannot be encoded.  No records are
/// returned for a program with errors.
pub(super) fn assemble_pass2(
    tokens: &[Token],
    catalog: &InstructionCatalog,
    symbols: &SymbolTable,
    literals: &mut LiteralTable,
    sections: &[ControlSection],
) -> Result<Pass2Output, ProgramError> {
    let span = span!(Level::ERROR, "pass 2");
    let _enter = span.enter();
    let entry = resolve_entry(tokens, symbols, sections)?;
    let mut pass = Pass2 {
        catalog,
        symbols,
        sections,
        literals,
        entry,
        section: None,
        locctr: Address::ZERO,
        text: TextRecordBuilder::new(),
        object: ObjectModule::new(),
        listing: Listing::default(),
    };
    for token in tokens {
        pass.statement(token)?;
    }
    pass.close_section();
    event!(
        Level::DEBUG,
        "pass 2 produced {} control sections",
        pass.object.section_count()
    );
    Ok(Pass2Output {
        object: pass.object,
        listing: pass.listing,
    })
}
