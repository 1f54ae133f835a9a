//! The prelude exports the structs which are useful in representing
//! things to do with the SIC/XE machine.  Providing this prelude is
//! the main purpose of the base crate.
pub use super::catalog::{CatalogError, InstructionCatalog, InstructionSpec};
pub use super::error::*;
pub use super::instruction::*;
pub use super::register::*;
pub use super::types::*;
