//! Primitives shared by the private kernel prover and the public sequencer.
//!
//! Everything here is pure: field-element and address newtypes, protocol
//! constants, fixed-capacity collections and the hash functions used to
//! silo side effects.

#![deny(rustdoc::broken_intra_doc_links)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]

mod collection;
pub mod constants;
mod gas;
pub mod hash;
mod types;

pub use collection::{
    array_non_empty_length, assert_length, non_empty_items, pad_array_end,
    sort_by_counter_get_sorted_hints, BoundedVec, CollectionError, IsEmpty, Ordered,
};
pub use gas::{add_fees, FeeOverflow, Gas, GasFees, GasSettings};
pub use types::{ContractAddress, Fr, FunctionSelector, Point};

/// Converts a `u64` into a field element.
pub fn fr(value: u64) -> Fr {
    Fr::from(value)
}

#[test]
fn test_fr_conversion() {
    assert_eq!(fr(7), Fr::from(7u8));
    assert!(fr(0).is_zero());
}
