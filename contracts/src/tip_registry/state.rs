//! # Registry State
//!
//! The explicit owned store behind a [`TipRegistry`](super::TipRegistry):
//! the name → account map, the controller → name reverse index, the global
//! counters, and the admin scalars. Nothing about the registry lives in
//! ambient or static state; cloning a `RegistryState` captures all of it.
//!
//! ## Invariants
//!
//! After every completed operation:
//!
//! 1. Every stored account has a non-null controller. Unregistered names
//!    have no entry.
//! 2. `names_by_controller[a] == n` iff `accounts[n].controller == a`.
//! 3. `custodied == Σ accounts[*].balance`.
//! 4. Every stored name is already in normalized form.
//!
//! [`RegistryState::verify_integrity`] checks all four.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tipjar_protocol::config::{Amount, RegistryConfig};
use tipjar_protocol::identity::Address;

use super::account::Account;
use super::error::RegistryError;
use super::name::normalize;

/// All mutable registry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    /// Registered handles, keyed by normalized name.
    pub(crate) accounts: HashMap<String, Account>,
    /// Reverse index: controller → normalized name.
    pub(crate) names_by_controller: HashMap<Address, String>,
    /// Number of first-time registrations. Renames do not count.
    pub(crate) total_agents: u64,
    /// Gross value ever tipped, fees included.
    pub(crate) total_tipped: Amount,
    /// Fees successfully forwarded to the fee sink.
    pub(crate) total_fees_collected: Amount,
    /// Native value currently held by the registry.
    pub(crate) custodied: Amount,
    /// Current fee sink.
    pub(crate) fee_recipient: Address,
    /// Current administrator.
    pub(crate) owner: Address,
    /// Nominated successor awaiting acceptance.
    pub(crate) pending_owner: Option<Address>,
    /// Global pause switch.
    pub(crate) paused: bool,
}

impl RegistryState {
    /// Creates the empty state a freshly deployed registry starts from.
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            accounts: HashMap::new(),
            names_by_controller: HashMap::new(),
            total_agents: 0,
            total_tipped: 0,
            total_fees_collected: 0,
            custodied: 0,
            fee_recipient: config.fee_recipient,
            owner: config.owner,
            pending_owner: None,
            paused: false,
        }
    }

    /// Account behind a normalized name.
    pub fn account(&self, name: &str) -> Option<&Account> {
        self.accounts.get(name)
    }

    /// Name controlled by `controller`.
    pub fn name_of(&self, controller: &Address) -> Option<&str> {
        self.names_by_controller.get(controller).map(String::as_str)
    }

    /// Number of currently registered handles.
    pub fn registered_count(&self) -> usize {
        self.accounts.len()
    }

    /// Native value currently held.
    pub fn custodied(&self) -> Amount {
        self.custodied
    }

    /// Binds `name` to `account` in both directions.
    pub(crate) fn bind(&mut self, name: String, account: Account) {
        self.names_by_controller
            .insert(account.controller, name.clone());
        self.accounts.insert(name, account);
    }

    /// Clears `name`'s slot and its reverse entry, returning the account.
    pub(crate) fn unbind(&mut self, name: &str) -> Option<Account> {
        let account = self.accounts.remove(name)?;
        self.names_by_controller.remove(&account.controller);
        Some(account)
    }

    /// Checks the invariants listed in the module docs.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidSnapshot`] describing the first violation.
    pub fn verify_integrity(&self) -> Result<(), RegistryError> {
        let violation = |msg: String| Err(RegistryError::InvalidSnapshot(msg));

        if self.owner.is_zero() {
            return violation("owner is the null address".into());
        }
        if self.fee_recipient.is_zero() {
            return violation("fee recipient is the null address".into());
        }
        if self.accounts.len() != self.names_by_controller.len() {
            return violation(format!(
                "{} accounts but {} reverse entries",
                self.accounts.len(),
                self.names_by_controller.len()
            ));
        }
        if self.accounts.len() as u64 != self.total_agents {
            return violation(format!(
                "{} accounts but {} registrations counted",
                self.accounts.len(),
                self.total_agents
            ));
        }

        let mut held: Amount = 0;
        for (name, account) in &self.accounts {
            if normalize(name).as_deref() != Ok(name.as_str()) {
                return violation(format!("name '{}' is not normalized", name));
            }
            if account.controller.is_zero() {
                return violation(format!("'{}' has a null controller", name));
            }
            if self.names_by_controller.get(&account.controller) != Some(name) {
                return violation(format!(
                    "reverse index for {} does not point at '{}'",
                    account.controller, name
                ));
            }
            held = match held.checked_add(account.balance) {
                Some(v) => v,
                None => return violation("balance sum overflows".into()),
            };
        }

        if held != self.custodied {
            return violation(format!(
                "balances sum to {} but {} is custodied",
                held, self.custodied
            ));
        }
        Ok(())
    }

    /// Encodes the state for persistence.
    pub fn encode(&self) -> Result<Vec<u8>, RegistryError> {
        bincode::serialize(self).map_err(|e| RegistryError::InvalidSnapshot(e.to_string()))
    }

    /// Decodes a state produced by [`encode`](Self::encode) and verifies it.
    pub fn decode(bytes: &[u8]) -> Result<Self, RegistryError> {
        let state: Self = bincode::deserialize(bytes)
            .map_err(|e| RegistryError::InvalidSnapshot(e.to_string()))?;
        state.verify_integrity()?;
        Ok(state)
    }

    /// Deterministic digest of the whole state.
    ///
    /// Accounts and reverse entries are hashed in sorted order so two
    /// registries that went through different histories but hold the same
    /// state agree on the root.
    pub fn state_root(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();

        let accounts: BTreeMap<&String, &Account> = self.accounts.iter().collect();
        for (name, account) in accounts {
            hasher.update(&(name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
            hasher.update(account.controller.as_bytes());
            hasher.update(&account.balance.to_le_bytes());
            hasher.update(&account.total_received.to_le_bytes());
            hasher.update(&account.tip_count.to_le_bytes());
            hasher.update(&account.registered_at.timestamp_millis().to_le_bytes());
        }

        hasher.update(&self.total_agents.to_le_bytes());
        hasher.update(&self.total_tipped.to_le_bytes());
        hasher.update(&self.total_fees_collected.to_le_bytes());
        hasher.update(&self.custodied.to_le_bytes());
        hasher.update(self.fee_recipient.as_bytes());
        hasher.update(self.owner.as_bytes());
        hasher.update(self.pending_owner.unwrap_or(Address::ZERO).as_bytes());
        hasher.update(&[self.paused as u8]);

        *hasher.finalize().as_bytes()
    }
}
