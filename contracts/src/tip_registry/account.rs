//! Per-handle custody records.

use serde::{Deserialize, Serialize};
use tipjar_protocol::clock::Timestamp;
use tipjar_protocol::config::Amount;
use tipjar_protocol::identity::Address;

/// The custody record behind one registered handle.
///
/// Only registered handles have an `Account`; an unregistered name simply
/// has no entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Address authorized to withdraw and to re-point this handle.
    pub controller: Address,
    /// Value currently withdrawable.
    pub balance: Amount,
    /// Cumulative net value ever credited by tips. Never decreases.
    pub total_received: Amount,
    /// Number of successful tips. Never decreases.
    pub tip_count: u64,
    /// When the handle was bound to its controller.
    pub registered_at: Timestamp,
}

impl Account {
    /// Creates an empty account bound to `controller`.
    pub fn new(controller: Address, registered_at: Timestamp) -> Self {
        Self {
            controller,
            balance: 0,
            total_received: 0,
            tip_count: 0,
            registered_at,
        }
    }
}

/// What [`resolve`](super::TipRegistry::resolve) returns for a name.
///
/// Unregistered names resolve to [`AccountView::default`]: null controller,
/// zero counters, and no registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    /// Current controller, or the null address.
    pub controller: Address,
    /// Withdrawable balance.
    pub balance: Amount,
    /// Cumulative net value received.
    pub total_received: Amount,
    /// Number of tips received.
    pub tip_count: u64,
    /// Registration time, `None` if unregistered.
    pub registered_at: Option<Timestamp>,
}

impl AccountView {
    /// Returns `true` if the name behind this view is registered.
    pub fn is_registered(&self) -> bool {
        !self.controller.is_zero()
    }
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            controller: account.controller,
            balance: account.balance,
            total_received: account.total_received,
            tip_count: account.tip_count,
            registered_at: Some(account.registered_at),
        }
    }
}
