//! The `base` crate defines the SIC/XE-related things which are
//! useful to any tool that handles SIC/XE code.  The idea is that if
//! you want to write an assembler (or a disassembler, or a loader)
//! it would depend on the base crate for the machine's registers,
//! instruction formats and instruction set.

mod error;
mod register;
mod types;

pub mod catalog;
pub mod instruction;
pub mod prelude;

#[test]
fn test_address_limits() {
    use prelude::Address;
    assert_eq!(Address::MAX.value(), 0xF_FFFF);
    assert!(Address::try_from(0x10_0000_u32).is_err());
    assert_eq!(
        Address::try_from(0x1033_u32).expect("test data should be in range"),
        Address::ZERO
            .checked_add(0x1033)
            .expect("test data should be in range")
    );
}
