//! # Identity Module
//!
//! Every party the registry deals with (controllers, tippers, the fee sink,
//! the owner) is identified by a 20-byte [`Address`].

pub mod address;

pub use address::{Address, AddressError, ADDRESS_LENGTH};
