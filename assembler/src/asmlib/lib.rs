//! Two-pass assembler for SIC/XE programs, producing a relocatable
//! object module.
#![deny(unreachable_pub)]
#![deny(unsafe_code)]
#![warn(clippy::must_use_candidate)]
#![warn(clippy::manual_string_new)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::return_self_not_must_use)]
#![warn(clippy::wildcard_imports)]
#![warn(clippy::bool_to_int_with_if)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::missing_errors_doc)]
#![warn(clippy::items_after_statements)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::unreadable_literal)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // fix later
#![allow(clippy::similar_names)] // fix later
#![allow(clippy::redundant_closure_for_method_calls)] // fix later
#![allow(clippy::doc_markdown)] // fix soon
#![allow(clippy::module_name_repetitions)]

mod ast;
mod directive;
mod driver;
mod lexer;
mod listing;
mod object;
mod parser;
mod source;
mod symbol;
mod symtab;
mod types;

pub use base::prelude::{InstructionCatalog, InstructionSpec};

pub use ast::{Constant, ConstantKind, Operator, Sign, Token};
pub use driver::*;
pub use listing::{Listing, ListingLine};
pub use object::{Modification, ObjectModule, ObjectRecord, TextRecord, MAX_TEXT_BYTES};
pub use source::{tokenize_line, tokenize_source};
pub use symbol::SymbolName;
pub use symtab::*;
pub use types::{AssemblerFailure, ErrorKind, LineNumber, ProgramError};
