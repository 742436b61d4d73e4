//! # Protocol Configuration & Constants
//!
//! Every magic number in the tip registry lives here. If you're hardcoding a
//! fee rate or a name bound somewhere else, you're doing it wrong.
//!
//! Changing the fee constants after deployment changes what every existing
//! tipper agreed to pay, so treat them as frozen.

use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::identity::Address;

// ---------------------------------------------------------------------------
// Value Units
// ---------------------------------------------------------------------------

/// Native value amount in the smallest denomination.
///
/// `u128` so that cumulative counters (total tipped, total received) cannot
/// realistically overflow even at 18 decimals.
pub type Amount = u128;

/// Number of decimal places in one whole unit of native value.
pub const UNIT_DECIMALS: u32 = 18;

/// One whole unit of native value (10^18 of the smallest denomination).
pub const UNIT: Amount = 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Fee Parameters
// ---------------------------------------------------------------------------

/// Smallest tip the registry accepts: 0.0001 unit. Anything below this is
/// dust and rejected outright.
pub const MIN_TIP: Amount = UNIT / 10_000;

/// Protocol fee on every tip, in basis points. 200 bp = 2%.
pub const FEE_BASIS_POINTS: u16 = 200;

/// Basis-point denominator. 10 000 bp = 100%.
pub const BASIS_POINTS_DENOMINATOR: u16 = 10_000;

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Maximum length of a normalized handle, in bytes.
pub const MAX_NAME_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Default `tracing` filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "tipjar_contracts=info,tipjar_protocol=info";

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

/// Parameters a registry is instantiated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Initial administrator (owner) of the registry.
    pub owner: Address,
    /// Initial fee sink that receives the protocol cut of every tip.
    pub fee_recipient: Address,
}

impl RegistryConfig {
    /// Creates a config with the given owner and fee recipient.
    pub fn new(owner: Address, fee_recipient: Address) -> Self {
        Self {
            owner,
            fee_recipient,
        }
    }

    /// Rejects configs that would leave the registry without an owner or
    /// with fees flowing to the null address.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.owner.is_zero() {
            bail!("registry owner must not be the null address");
        }
        if self.fee_recipient.is_zero() {
            bail!("fee recipient must not be the null address");
        }
        Ok(())
    }

    /// Loads and validates a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read registry config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse registry config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Splits a tip into `(fee, net)` at the protocol fee rate.
///
/// `fee = floor(amount * FEE_BASIS_POINTS / BASIS_POINTS_DENOMINATOR)` and
/// `net = amount - fee`, so `fee + net == amount` for every input.
/// Returns `None` only if the intermediate product overflows.
pub fn split_fee(amount: Amount) -> Option<(Amount, Amount)> {
    let fee = amount.checked_mul(Amount::from(FEE_BASIS_POINTS))?
        / Amount::from(BASIS_POINTS_DENOMINATOR);
    Some((fee, amount - fee))
}

/// Renders an amount as a decimal string in whole units, mainly for logging.
/// Trailing zeros in the fractional part are trimmed.
pub fn format_units(amount: Amount) -> String {
    let whole = amount / UNIT;
    let frac = amount % UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = UNIT_DECIMALS as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
