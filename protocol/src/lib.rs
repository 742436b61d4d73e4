// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tipjar Protocol: Shared Primitives
//!
//! The pieces every tipjar crate agrees on, with no ledger semantics of
//! their own:
//!
//! - **config**: Protocol constants (units, fee rate, name bounds) and the
//!   deployment config.
//! - **identity**: The 20-byte [`Address`](identity::Address) type.
//! - **clock**: The time source the registry stamps registrations with.
//! - **logging**: `tracing` subscriber setup for whoever hosts a registry.
//!
//! The state machine itself lives in `tipjar-contracts`.

pub mod clock;
pub mod config;
pub mod identity;
pub mod logging;
