// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tipjar Contracts
//!
//! The tip registry: a name-addressed custody ledger. Parties register a
//! unique handle, anyone else can tip value to it, and the handle's
//! controller withdraws at will.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. We use `checked_add` and
//!    `checked_sub` everywhere, because wrapping arithmetic and money do not
//!    mix.
//! 2. Effects before interactions: state is final before value leaves.
//! 3. Every failure is a named [`RegistryError`](tip_registry::RegistryError)
//!    variant and leaves state untouched. The single exception is a tip
//!    whose fee the sink rejects, which succeeds with the fee credited to
//!    the handle.
//! 4. Every persisted type is serializable (serde) for snapshots and the
//!    audit log.

pub mod tip_registry;

pub use tip_registry::{RegistryError, RegistryEvent, TipReceipt, TipRegistry};
