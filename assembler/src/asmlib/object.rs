//! The object module: the records the assembler produces for each
//! control section.
//!
//! Within a section the records always appear in the order Header,
//! Define, Reference, Text, Modification, End, whatever order they
//! were produced in.  Linkers depend on this order.
use std::fmt::{self, Display, Formatter, Write};

use tracing::{event, Level};

use base::prelude::Address;

use super::ast::Sign;
use super::symbol::SymbolName;

/// A Text record holds at most this many bytes.
pub const MAX_TEXT_BYTES: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    pub start: Address,
    pub bytes: Vec<u8>,
}

impl Display for TextRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "T{}{:02X}", self.start, self.bytes.len())?;
        for byte in &self.bytes {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// A request to the linker to adjust a field once the address of
/// `symbol` is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modification {
    /// The address of the first byte containing the field.
    pub address: Address,
    /// The length of the field in half-bytes (5 for a format 4
    /// address, 6 for a word).
    pub half_bytes: u8,
    pub sign: Sign,
    pub symbol: SymbolName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectRecord {
    Header {
        name: SymbolName,
        start: Address,
        length: u32,
    },
    Define(Vec<(SymbolName, Address)>),
    Reference(Vec<SymbolName>),
    Text(TextRecord),
    Modification(Modification),
    /// Only the primary section's End record has an address.
    End(Option<Address>),
}

impl Display for ObjectRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRecord::Header {
                name,
                start,
                length,
            } => write!(f, "H{name:<6}{start}{length:06X}"),
            ObjectRecord::Define(symbols) => {
                f.write_char('D')?;
                for (name, address) in symbols {
                    write!(f, "{name}{address}")?;
                }
                Ok(())
            }
            ObjectRecord::Reference(symbols) => {
                f.write_char('R')?;
                for name in symbols {
                    write!(f, "{name:<6}")?;
                }
                Ok(())
            }
            ObjectRecord::Text(record) => record.fmt(f),
            ObjectRecord::Modification(Modification {
                address,
                half_bytes,
                sign,
                symbol,
            }) => write!(f, "M{address}{half_bytes:02X}{sign}{symbol}"),
            ObjectRecord::End(Some(address)) => write!(f, "E{address}"),
            ObjectRecord::End(None) => f.write_char('E'),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SectionRecords {
    header: Option<ObjectRecord>,
    define: Option<ObjectRecord>,
    reference: Option<ObjectRecord>,
    text: Vec<ObjectRecord>,
    modifications: Vec<ObjectRecord>,
    end: Option<ObjectRecord>,
}

impl SectionRecords {
    fn records(&self) -> impl Iterator<Item = &ObjectRecord> {
        self.header
            .iter()
            .chain(self.define.iter())
            .chain(self.reference.iter())
            .chain(self.text.iter())
            .chain(self.modifications.iter())
            .chain(self.end.iter())
    }
}

/// All the records of a program, grouped by control section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectModule {
    sections: Vec<SectionRecords>,
}

impl ObjectModule {
    #[must_use]
    pub fn new() -> ObjectModule {
        ObjectModule::default()
    }

    /// Add a record to the section with index `section`.  A section
    /// has only one Header, Define, Reference and End record, so
    /// adding another of those replaces the first.
    pub(crate) fn add(&mut self, section: usize, record: ObjectRecord) {
        if self.sections.len() <= section {
            self.sections.resize_with(section + 1, SectionRecords::default);
        }
        let records = &mut self.sections[section];
        match record {
            ObjectRecord::Header { .. } => records.header = Some(record),
            ObjectRecord::Define(_) => records.define = Some(record),
            ObjectRecord::Reference(_) => records.reference = Some(record),
            ObjectRecord::Text(_) => records.text.push(record),
            ObjectRecord::Modification(_) => records.modifications.push(record),
            ObjectRecord::End(_) => records.end = Some(record),
        }
    }

    /// Every record, with the index of its section, in output order.
    pub fn records(&self) -> impl Iterator<Item = (usize, &ObjectRecord)> {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(index, section)| section.records().map(move |record| (index, record)))
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// The object module text: one record per line.
impl Display for ObjectModule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (_, record) in self.records() {
            writeln!(f, "{record}")?;
        }
        Ok(())
    }
}

/// Accumulates emitted bytes into Text records.  A record is sealed
/// when it is full, or when the next bytes do not follow on directly
/// from the bytes already in it.
#[derive(Debug, Default)]
pub(crate) struct TextRecordBuilder {
    start: Option<Address>,
    bytes: Vec<u8>,
}

impl TextRecordBuilder {
    pub(crate) fn new() -> TextRecordBuilder {
        TextRecordBuilder::default()
    }

    fn next_address(&self) -> Option<Address> {
        let start = self.start?;
        start.checked_add(u32::try_from(self.bytes.len()).ok()?)
    }

    /// Append `data`, which is located at `address`.  Returns the
    /// records sealed to make room for it.
    pub(crate) fn push(&mut self, address: Address, data: &[u8]) -> Vec<TextRecord> {
        let mut sealed = Vec::new();
        let mut chunk_address = Some(address);
        for chunk in data.chunks(MAX_TEXT_BYTES) {
            let Some(here) = chunk_address else {
                break;
            };
            if self.start.is_some()
                && (self.next_address() != Some(here)
                    || self.bytes.len() + chunk.len() > MAX_TEXT_BYTES)
            {
                sealed.extend(self.finish());
            }
            if self.start.is_none() {
                self.start = Some(here);
            }
            self.bytes.extend_from_slice(chunk);
            chunk_address = self.next_address();
        }
        sealed
    }

    /// Seal the record being built, if there is one.
    pub(crate) fn finish(&mut self) -> Option<TextRecord> {
        let start = self.start.take()?;
        let record = TextRecord {
            start,
            bytes: std::mem::take(&mut self.bytes),
        };
        event!(
            Level::DEBUG,
            "sealed text record at {start} with {} bytes",
            record.bytes.len()
        );
        Some(record)
    }
}

#[cfg(test)]
mod tests;
