//! Runs the two passes over a program and writes the results.
use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{event, span, Level};

use base::prelude::InstructionCatalog;

mod output;
mod pass1;
mod pass2;

#[cfg(test)]
mod tests;

use super::ast::Token;
use super::listing::Listing;
use super::object::ObjectModule;
use super::source::tokenize_source;
use super::symtab::{ControlSection, LiteralTable, SymbolTable};
use super::types::{AssemblerFailure, ProgramError};
use pass1::{assemble_pass1, Pass1Output};
use pass2::{assemble_pass2, Pass2Output};

/// Everything produced by assembling a program.
#[derive(Debug)]
pub struct AssemblyModule {
    /// The statements, with the addresses, flags and formats assigned
    /// by pass 1.
    pub tokens: Vec<Token>,
    pub symbols: SymbolTable,
    pub literals: LiteralTable,
    pub sections: Vec<ControlSection>,
    pub object: ObjectModule,
    pub listing: Listing,
}

/// Assemble a whole program held in memory.
///
/// # Errors
///
/// The first error in the program.  Nothing is returned for a program
/// containing an error.
pub fn assemble_source(
    source: &str,
    catalog: &InstructionCatalog,
) -> Result<AssemblyModule, ProgramError> {
    let span = span!(Level::ERROR, "assemble");
    let _enter = span.enter();
    let tokens = tokenize_source(source)?;
    let Pass1Output {
        tokens,
        symbols,
        mut literals,
        sections,
    } = assemble_pass1(tokens, catalog)?;
    let Pass2Output { object, listing } =
        assemble_pass2(&tokens, catalog, &symbols, &mut literals, &sections)?;
    Ok(AssemblyModule {
        tokens,
        symbols,
        literals,
        sections,
        object,
        listing,
    })
}

/// Where (and whether) to write each of the assembler's outputs.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// The object module goes to stdout when this is `None`.
    pub object: Option<PathBuf>,
    pub symtab: Option<PathBuf>,
    pub littab: Option<PathBuf>,
    /// When set, print the assembly listing on stdout.
    pub list: bool,
}

/// Read an instruction catalog file.  Without a file, the standard
/// SIC/XE instruction set is used.
///
/// # Errors
///
/// The file cannot be read or is not a valid catalog.
pub fn load_catalog(path: Option<&Path>) -> Result<InstructionCatalog, AssemblerFailure> {
    let Some(path) = path else {
        return Ok(InstructionCatalog::standard());
    };
    let text = fs::read_to_string(path).map_err(|error| AssemblerFailure::IoErrorOnInput {
        filename: path.as_os_str().to_owned(),
        error,
        line_number: None,
    })?;
    let catalog =
        InstructionCatalog::parse(&text).map_err(|error| AssemblerFailure::BadCatalog {
            filename: Some(path.to_owned()),
            error,
        })?;
    event!(
        Level::DEBUG,
        "loaded {} instructions from {}",
        catalog.len(),
        path.display()
    );
    Ok(catalog)
}

fn read_source(input_file: &OsStr) -> Result<String, AssemblerFailure> {
    let input = OpenOptions::new()
        .read(true)
        .open(input_file)
        .map_err(|e| AssemblerFailure::IoErrorOnInput {
            filename: input_file.to_owned(),
            error: e,
            line_number: None,
        })?;
    let mut source = String::new();
    for (line, input_item) in BufReader::new(input)
        .lines()
        .enumerate()
        .map(|(n, sl)| (n + 1, sl))
    {
        match input_item {
            Err(e) => {
                return Err(AssemblerFailure::IoErrorOnInput {
                    filename: input_file.to_owned(),
                    error: e,
                    line_number: Some(line),
                });
            }
            Ok(source_line) => {
                source.push_str(&source_line);
                source.push('\n');
            }
        }
    }
    Ok(source)
}

/// Assemble the program in `input_file` and write the outputs
/// selected by `options`.
///
/// # Errors
///
/// The input cannot be read, the program contains an error, or an
/// output cannot be written.  No output file is written for a program
/// containing an error.
pub fn assemble_file(
    input_file: &OsStr,
    catalog: &InstructionCatalog,
    options: &OutputOptions,
) -> Result<(), AssemblerFailure> {
    let source = read_source(input_file)?;
    let module = assemble_source(&source, catalog)?;
    if let Some(path) = options.symtab.as_deref() {
        output::write_to_file(path, "symbol table", &module.symbols)?;
    }
    if let Some(path) = options.littab.as_deref() {
        output::write_to_file(path, "literal table", &module.literals)?;
    }
    match options.object.as_deref() {
        Some(path) => output::write_to_file(path, "object module", &module.object)?,
        None => output::write_to_stdout("object module", &module.object)?,
    }
    if options.list {
        output::write_to_stdout("listing", &module.listing)?;
    }
    Ok(())
}
