use std::error::Error;
use std::ffi::{OsStr, OsString};
use std::fmt::{self, Display, Formatter};
use std::io::Error as IoError;
use std::path::PathBuf;

use base::prelude::CatalogError;

use super::symbol::SymbolName;

/// Source line numbers count from 1.
pub type LineNumber = usize;

/// The ways in which a program can be wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The line does not follow the source grammar.
    ParseFailure(String),
    /// A name is used but is neither defined in, nor imported into,
    /// the control section using it.
    UnresolvedSymbol {
        name: SymbolName,
        section: SymbolName,
    },
    /// The instruction cannot be assembled in the requested format.
    UnsupportedFormat { mnemonic: String, format: u8 },
    /// A value does not fit into the field which should hold it.
    OverflowFailure(String),
}

impl ErrorKind {
    pub(crate) fn parse<S: Into<String>>(msg: S) -> ErrorKind {
        ErrorKind::ParseFailure(msg.into())
    }

    pub(crate) fn overflow<S: Into<String>>(msg: S) -> ErrorKind {
        ErrorKind::OverflowFailure(msg.into())
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            ErrorKind::ParseFailure(msg) => write!(f, "syntax error: {msg}"),
            ErrorKind::UnresolvedSymbol { name, section } => {
                if section.is_empty() {
                    write!(f, "symbol {name} is not defined in the unnamed control section")
                } else {
                    write!(f, "symbol {name} is not defined in control section {section}")
                }
            }
            ErrorKind::UnsupportedFormat { mnemonic, format } => {
                write!(f, "{mnemonic} cannot be assembled as a format {format} instruction")
            }
            ErrorKind::OverflowFailure(msg) => write!(f, "value out of range: {msg}"),
        }
    }
}

/// An error in the program being assembled, together with where it
/// was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramError {
    pub line: LineNumber,
    /// The text of the operator or operand at fault.
    pub offending: String,
    pub kind: ErrorKind,
}

impl ProgramError {
    pub(crate) fn new<S: Into<String>>(line: LineNumber, offending: S, kind: ErrorKind) -> Self {
        ProgramError {
            line,
            offending: offending.into(),
            kind,
        }
    }
}

impl Display for ProgramError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        if self.offending.is_empty() {
            write!(f, "line {}: {}", self.line, self.kind)
        } else {
            write!(f, "line {}: {} (at '{}')", self.line, self.kind, self.offending)
        }
    }
}

impl Error for ProgramError {}

#[derive(Debug)]
pub enum AssemblerFailure {
    BadProgram(ProgramError),
    BadCatalog {
        filename: Option<PathBuf>,
        error: CatalogError,
    },
    IoErrorOnStdout {
        error: IoError,
    },
    IoErrorOnInput {
        filename: OsString,
        error: IoError,
        line_number: Option<LineNumber>,
    },
    IoErrorOnOutput {
        filename: PathBuf,
        error: IoError,
    },
}

impl From<ProgramError> for AssemblerFailure {
    fn from(e: ProgramError) -> AssemblerFailure {
        AssemblerFailure::BadProgram(e)
    }
}

fn write_os_string(f: &mut Formatter<'_>, s: &OsStr) -> Result<(), fmt::Error> {
    match s.to_str() {
        Some(unicode_name) => f.write_str(unicode_name),
        None => write!(
            f,
            "{} (some non-Unicode characters changed to make it printable)",
            s.to_string_lossy(),
        ),
    }
}

impl Display for AssemblerFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            AssemblerFailure::BadProgram(e) => e.fmt(f),
            AssemblerFailure::BadCatalog { filename, error } => match filename {
                Some(name) => {
                    write!(f, "bad instruction catalog {}: {error}", name.display())
                }
                None => write!(f, "bad instruction catalog: {error}"),
            },
            AssemblerFailure::IoErrorOnStdout { error } => {
                write!(f, "error writing on stdout: {error}")
            }
            AssemblerFailure::IoErrorOnInput {
                filename,
                error,
                line_number,
            } => {
                f.write_str("I/O error reading input file ")?;
                write_os_string(f, filename)?;
                if let Some(n) = line_number {
                    write!(f, " at line {n}")?;
                }
                write!(f, ": {error}")
            }
            AssemblerFailure::IoErrorOnOutput { filename, error } => {
                write!(
                    f,
                    "I/O error writing output file {}: {error}",
                    filename.display(),
                )
            }
        }
    }
}

impl Error for AssemblerFailure {}
