//! # Value Transfer
//!
//! Moving native value out of the registry is a collaborator, not something
//! the registry does itself. A transfer reports success or failure as a
//! value; it never unwinds. Callers branch on the outcome explicitly: a
//! rejected fee forward is absorbed into the tipped handle's balance, a
//! rejected withdrawal fails the whole call.
//!
//! Recipients that run code on receipt are handed the registry, so they can
//! call back into it before the outer operation returns. That is exactly
//! the hazard the reentrancy guard exists for.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tipjar_protocol::config::Amount;
use tipjar_protocol::identity::Address;

use super::TipRegistry;

/// Result of one outbound transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The recipient accepted the value.
    Delivered,
    /// The recipient rejected the value, with a reason for the logs.
    Rejected(String),
}

impl TransferOutcome {
    /// Returns `true` if the value was delivered.
    pub fn is_delivered(&self) -> bool {
        matches!(self, TransferOutcome::Delivered)
    }
}

/// Moves native value from the registry to an address.
pub trait ValueTransfer {
    /// Sends `amount` to `to`. `registry` is the caller, passed along so a
    /// recipient can re-enter it.
    fn send_value(&self, registry: &TipRegistry, to: Address, amount: Amount) -> TransferOutcome;
}

impl<T: ValueTransfer + ?Sized> ValueTransfer for Rc<T> {
    fn send_value(&self, registry: &TipRegistry, to: Address, amount: Amount) -> TransferOutcome {
        (**self).send_value(registry, to, amount)
    }
}

impl<T: ValueTransfer + ?Sized> ValueTransfer for Box<T> {
    fn send_value(&self, registry: &TipRegistry, to: Address, amount: Amount) -> TransferOutcome {
        (**self).send_value(registry, to, amount)
    }
}

/// Code a recipient runs when value arrives. The value is credited to the
/// recipient only if the hook returns [`TransferOutcome::Delivered`].
pub type ReceiveHook = Rc<dyn Fn(&TipRegistry, Amount) -> TransferOutcome>;

#[derive(Clone)]
enum Recipient {
    Rejecting(String),
    Hooked(ReceiveHook),
}

/// In-memory native value book with programmable recipients.
///
/// Plain addresses accept everything. Individual addresses can be made to
/// reject transfers or to run a [`ReceiveHook`], which is how replay tools
/// and tests model recipients that refuse value or call back in.
#[derive(Default)]
pub struct InMemoryValueTransfer {
    balances: RefCell<HashMap<Address, Amount>>,
    recipients: RefCell<HashMap<Address, Recipient>>,
}

impl InMemoryValueTransfer {
    /// Creates a book where every address accepts value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `address` reject every transfer with `reason`.
    pub fn reject(&self, address: Address, reason: impl Into<String>) {
        self.recipients
            .borrow_mut()
            .insert(address, Recipient::Rejecting(reason.into()));
    }

    /// Makes `address` run `hook` on every transfer.
    pub fn on_receive<F>(&self, address: Address, hook: F)
    where
        F: Fn(&TipRegistry, Amount) -> TransferOutcome + 'static,
    {
        self.recipients
            .borrow_mut()
            .insert(address, Recipient::Hooked(Rc::new(hook)));
    }

    /// Restores plain accept-everything behaviour for `address`.
    pub fn accept(&self, address: Address) {
        self.recipients.borrow_mut().remove(&address);
    }

    /// Total value delivered to `address` so far.
    pub fn received(&self, address: Address) -> Amount {
        self.balances
            .borrow()
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Total value delivered to anyone.
    pub fn total_delivered(&self) -> Amount {
        self.balances.borrow().values().sum()
    }
}

impl ValueTransfer for InMemoryValueTransfer {
    fn send_value(&self, registry: &TipRegistry, to: Address, amount: Amount) -> TransferOutcome {
        // Clone out of the map: a hook may re-enter and reconfigure recipients.
        let recipient = self.recipients.borrow().get(&to).cloned();
        let outcome = match recipient {
            Some(Recipient::Rejecting(reason)) => TransferOutcome::Rejected(reason),
            Some(Recipient::Hooked(hook)) => hook(registry, amount),
            None => TransferOutcome::Delivered,
        };

        if outcome.is_delivered() {
            let mut balances = self.balances.borrow_mut();
            let received = balances.entry(to).or_insert(0);
            *received = received.saturating_add(amount);
        }
        outcome
    }
}
