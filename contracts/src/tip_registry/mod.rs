//! # Tip Registry Contract
//!
//! A name-addressed custody ledger. Parties register a unique handle, anyone
//! else can tip value to that handle, and the handle's controller withdraws
//! at will. The registry owns every piece of mutable state:
//!
//! - **Registry**: normalized name → [`Account`], plus the controller →
//!   name reverse index. One name per controller, one controller per name.
//! - **Accounting**: per-handle balances and counters, global tipped /
//!   fee counters, and the value currently in custody.
//! - **Admin**: owner capability, two-step ownership transfer, pause
//!   switch, fee sink (see the `admin` module).
//!
//! ## Execution Model
//!
//! Calls run one at a time; a call and every nested call it triggers
//! complete before the next one starts. The only hazard is reentrancy: an
//! outbound transfer runs recipient code, which may call back in. Two
//! defences apply to every balance-moving operation:
//!
//! 1. Effects before interactions. Balances and counters are final before
//!    any value leaves.
//! 2. `tip`, `withdraw`, `withdraw_amount` and `receive_unsolicited` run
//!    under a [`ReentrancyGuard`]. Registration and re-pointing move no
//!    value and stay unguarded.
//!
//! ## Atomicity
//!
//! Validation happens before any mutation, so a failing call changes
//! nothing. A rejected outbound transfer undoes everything the recipient
//! did during it. The one designed partial outcome: a tip whose fee the
//! sink rejects still succeeds, with the fee credited to the handle.

pub mod account;
mod admin;
mod call_frame;
pub mod error;
pub mod events;
pub mod guard;
pub mod metrics;
pub mod name;
pub mod state;
pub mod transfer;

use std::cell::{Ref, RefCell, RefMut};

use tipjar_protocol::clock::Clock;
use tipjar_protocol::config::{format_units, split_fee, Amount, RegistryConfig, MIN_TIP};
use tipjar_protocol::identity::Address;
use tracing::{debug, info, warn};

pub use account::{Account, AccountView};
pub use error::RegistryError;
pub use events::{EventLog, RegistryEvent};
pub use guard::ReentrancyGuard;
pub use metrics::RegistryMetrics;
pub use name::normalize;
pub use state::RegistryState;
pub use transfer::{InMemoryValueTransfer, ReceiveHook, TransferOutcome, ValueTransfer};

use call_frame::CallFrames;

/// What a successful tip did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipReceipt {
    /// Normalized handle that was tipped.
    pub name: String,
    /// Amount credited to the handle from the tip itself.
    pub net_amount: Amount,
    /// Protocol fee on the tip.
    pub fee: Amount,
    /// Whether the fee reached the fee sink. `false` means it was credited
    /// to the handle instead.
    pub fee_forwarded: bool,
}

/// The tip registry.
///
/// Not `Sync`: the registry models a strictly sequential execution
/// environment and uses interior mutability so that recipients of outbound
/// transfers can hold `&TipRegistry` and call back in.
pub struct TipRegistry {
    state: RefCell<RegistryState>,
    events: RefCell<EventLog>,
    frames: CallFrames,
    guard: ReentrancyGuard,
    clock: Box<dyn Clock>,
    transfer: Box<dyn ValueTransfer>,
    metrics: Option<RegistryMetrics>,
}

impl TipRegistry {
    /// Creates an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidRecipient`] if the config names the
    /// null address as owner or fee recipient.
    pub fn new(
        config: &RegistryConfig,
        clock: Box<dyn Clock>,
        transfer: Box<dyn ValueTransfer>,
    ) -> Result<Self, RegistryError> {
        if config.owner.is_zero() || config.fee_recipient.is_zero() {
            return Err(RegistryError::InvalidRecipient);
        }
        Ok(Self::from_state(RegistryState::new(config), clock, transfer))
    }

    /// Rebuilds a registry from a previously taken [`snapshot`](Self::snapshot).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidSnapshot`] if the state fails its
    /// integrity checks.
    pub fn restore(
        state: RegistryState,
        clock: Box<dyn Clock>,
        transfer: Box<dyn ValueTransfer>,
    ) -> Result<Self, RegistryError> {
        state.verify_integrity()?;
        Ok(Self::from_state(state, clock, transfer))
    }

    fn from_state(
        state: RegistryState,
        clock: Box<dyn Clock>,
        transfer: Box<dyn ValueTransfer>,
    ) -> Self {
        Self {
            state: RefCell::new(state),
            events: RefCell::new(EventLog::new()),
            frames: CallFrames::new(),
            guard: ReentrancyGuard::new(),
            clock,
            transfer,
            metrics: None,
        }
    }

    /// Attaches Prometheus counters.
    pub fn with_metrics(mut self, metrics: RegistryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Binds `raw_name` to `caller`.
    ///
    /// If `caller` already controls a handle, the handle moves: balance,
    /// total received and tip count are carried to a fresh account under
    /// the new name, the old name is cleared and becomes available, and an
    /// [`RegistryEvent::AgentUpdated`] is emitted. Otherwise a new empty
    /// account is created, the agent counter goes up, and an
    /// [`RegistryEvent::AgentRegistered`] is emitted.
    ///
    /// # Errors
    ///
    /// [`RegistryError::EnforcedPause`], [`RegistryError::InvalidRecipient`]
    /// for the null caller, any normalization error, or
    /// [`RegistryError::NameAlreadyTaken`].
    pub fn register(&self, raw_name: &str, caller: Address) -> Result<(), RegistryError> {
        self.when_not_paused()?;
        if caller.is_zero() {
            return Err(RegistryError::InvalidRecipient);
        }
        let name = normalize(raw_name)?;
        let now = self.clock.now();

        let (previous, total_agents) = {
            let state = self.state();
            if state.account(&name).is_some() {
                return Err(RegistryError::NameAlreadyTaken(name));
            }
            let previous = state.name_of(&caller).map(str::to_owned);
            let total_agents = match previous {
                Some(_) => state.total_agents,
                None => state
                    .total_agents
                    .checked_add(1)
                    .ok_or(RegistryError::AmountOverflow)?,
            };
            (previous, total_agents)
        };

        match previous {
            Some(old_name) => {
                {
                    let mut state = self.state_mut();
                    let old = state
                        .unbind(&old_name)
                        .ok_or_else(|| RegistryError::AgentNotRegistered(old_name.clone()))?;
                    let mut moved = Account::new(caller, now);
                    moved.balance = old.balance;
                    moved.total_received = old.total_received;
                    moved.tip_count = old.tip_count;
                    state.bind(name.clone(), moved);
                }
                info!(%caller, old_name = %old_name, new_name = %name, "handle renamed");
                self.record(|m| m.renames_total.inc());
                self.emit(RegistryEvent::AgentUpdated {
                    old_name,
                    new_name: name,
                    old_controller: caller,
                    new_controller: caller,
                });
            }
            None => {
                {
                    let mut state = self.state_mut();
                    state.bind(name.clone(), Account::new(caller, now));
                    state.total_agents = total_agents;
                }
                info!(%caller, name = %name, total_agents, "handle registered");
                self.record(|m| m.registrations_total.inc());
                self.emit(RegistryEvent::AgentRegistered {
                    name,
                    controller: caller,
                    registered_at: now,
                });
            }
        }
        Ok(())
    }

    /// Hands control of `caller`'s handle to `new_controller`.
    ///
    /// Only the controller field and the reverse index change; balance and
    /// history stay with the name.
    ///
    /// # Errors
    ///
    /// [`RegistryError::EnforcedPause`],
    /// [`RegistryError::AgentNotRegistered`] if `caller` controls nothing,
    /// [`RegistryError::InvalidRecipient`] for the null address, or
    /// [`RegistryError::ControllerAlreadyBound`] if `new_controller`
    /// already controls another handle.
    pub fn update_controller(
        &self,
        caller: Address,
        new_controller: Address,
    ) -> Result<(), RegistryError> {
        self.when_not_paused()?;

        let name = {
            let state = self.state();
            let name = state
                .name_of(&caller)
                .map(str::to_owned)
                .ok_or_else(|| RegistryError::AgentNotRegistered(caller.to_string()))?;
            if new_controller.is_zero() {
                return Err(RegistryError::InvalidRecipient);
            }
            if new_controller != caller {
                if let Some(bound) = state.name_of(&new_controller) {
                    return Err(RegistryError::ControllerAlreadyBound {
                        address: new_controller,
                        name: bound.to_owned(),
                    });
                }
            }
            name
        };

        {
            let mut state = self.state_mut();
            let mut account = state
                .unbind(&name)
                .ok_or_else(|| RegistryError::AgentNotRegistered(name.clone()))?;
            account.controller = new_controller;
            state.bind(name.clone(), account);
        }

        info!(name = %name, old_controller = %caller, %new_controller, "controller updated");
        self.record(|m| m.controller_updates_total.inc());
        self.emit(RegistryEvent::AgentUpdated {
            old_name: name.clone(),
            new_name: name,
            old_controller: caller,
            new_controller,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tipping
    // -----------------------------------------------------------------------

    /// Credits `amount` from `sender` to the handle `raw_name`.
    ///
    /// The fee is `floor(amount * FEE_BASIS_POINTS / 10_000)`; the rest is
    /// credited to the handle. Balances and counters are updated before the
    /// fee is forwarded. If the fee sink rejects the fee, the tip still
    /// succeeds and the fee is credited to the handle as well.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ReentrantCall`], [`RegistryError::EnforcedPause`],
    /// [`RegistryError::TipTooSmall`], any normalization error,
    /// [`RegistryError::AgentNotRegistered`],
    /// [`RegistryError::CannotTipSelf`], or
    /// [`RegistryError::AmountOverflow`].
    pub fn tip(
        &self,
        raw_name: &str,
        sender: Address,
        amount: Amount,
    ) -> Result<TipReceipt, RegistryError> {
        self.guarded("tip", || {
            self.when_not_paused()?;
            if amount < MIN_TIP {
                return Err(RegistryError::TipTooSmall {
                    amount,
                    minimum: MIN_TIP,
                });
            }
            let name = normalize(raw_name)?;

            // Checks.
            let (fee, net_amount, controller, fee_recipient, updated) = {
                let state = self.state();
                let account = state
                    .account(&name)
                    .ok_or_else(|| RegistryError::AgentNotRegistered(name.clone()))?;
                if account.controller == sender {
                    return Err(RegistryError::CannotTipSelf);
                }
                let (fee, net_amount) =
                    split_fee(amount).ok_or(RegistryError::AmountOverflow)?;
                let updated = TipEffects {
                    balance: add(account.balance, net_amount)?,
                    total_received: add(account.total_received, net_amount)?,
                    tip_count: account
                        .tip_count
                        .checked_add(1)
                        .ok_or(RegistryError::AmountOverflow)?,
                    total_tipped: add(state.total_tipped, amount)?,
                    total_fees_collected: add(state.total_fees_collected, fee)?,
                    custodied: add(state.custodied, amount)?,
                };
                (fee, net_amount, account.controller, state.fee_recipient, updated)
            };

            // Effects.
            {
                let mut state = self.state_mut();
                state.total_tipped = updated.total_tipped;
                state.total_fees_collected = updated.total_fees_collected;
                state.custodied = updated.custodied;
                if let Some(account) = state.accounts.get_mut(&name) {
                    account.balance = updated.balance;
                    account.total_received = updated.total_received;
                    account.tip_count = updated.tip_count;
                }
            }

            // Interactions.
            let fee_forwarded = if fee == 0 {
                false
            } else {
                match self.dispatch(fee_recipient, fee)? {
                    TransferOutcome::Delivered => {
                        self.record(|m| m.fee_forwards_total.inc());
                        self.emit(RegistryEvent::FeesCollected {
                            recipient: fee_recipient,
                            amount: fee,
                        });
                        true
                    }
                    TransferOutcome::Rejected(reason) => {
                        warn!(
                            name = %name,
                            %fee_recipient,
                            fee = %format_units(fee),
                            reason = %reason,
                            "fee sink rejected fee; crediting handle"
                        );
                        self.refund_fee(&name, fee)?;
                        self.record(|m| m.fee_refunds_total.inc());
                        false
                    }
                }
            };

            let name = self.current_handle(&name, controller);
            info!(
                name = %name,
                %sender,
                amount = %format_units(amount),
                net = %format_units(net_amount),
                fee = %format_units(fee),
                fee_forwarded,
                "tip received"
            );
            self.record(|m| m.tips_total.inc());
            self.emit(RegistryEvent::Tipped {
                name: name.clone(),
                sender,
                net_amount,
                fee,
            });

            Ok(TipReceipt {
                name,
                net_amount,
                fee,
                fee_forwarded,
            })
        })
    }

    /// Credits a fee the sink rejected back to the tipped handle.
    fn refund_fee(&self, name: &str, fee: Amount) -> Result<(), RegistryError> {
        let (balance, total_fees_collected) = {
            let state = self.state();
            let account = state
                .account(name)
                .ok_or_else(|| RegistryError::AgentNotRegistered(name.to_owned()))?;
            (
                add(account.balance, fee)?,
                state
                    .total_fees_collected
                    .checked_sub(fee)
                    .ok_or(RegistryError::AmountOverflow)?,
            )
        };

        let mut state = self.state_mut();
        state.total_fees_collected = total_fees_collected;
        if let Some(account) = state.accounts.get_mut(name) {
            account.balance = balance;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Withdrawal
    // -----------------------------------------------------------------------

    /// Withdraws the caller's entire balance to the caller.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ReentrantCall`], [`RegistryError::EnforcedPause`],
    /// [`RegistryError::AgentNotRegistered`], [`RegistryError::NoBalance`]
    /// if the balance is zero, or [`RegistryError::TransferFailed`] if the
    /// caller rejects the value (nothing changes in that case).
    pub fn withdraw(&self, caller: Address) -> Result<Amount, RegistryError> {
        self.guarded("withdraw", || {
            self.when_not_paused()?;
            let (name, balance) = self.controlled_balance(caller)?;
            if balance == 0 {
                return Err(RegistryError::NoBalance {
                    requested: 0,
                    available: 0,
                });
            }
            self.pay_out(&name, caller, balance)
        })
    }

    /// Withdraws exactly `amount` of the caller's balance to the caller.
    ///
    /// # Errors
    ///
    /// As [`withdraw`](Self::withdraw); [`RegistryError::NoBalance`] also
    /// covers a zero `amount` and one larger than the balance.
    pub fn withdraw_amount(&self, caller: Address, amount: Amount) -> Result<Amount, RegistryError> {
        self.guarded("withdraw_amount", || {
            self.when_not_paused()?;
            let (name, balance) = self.controlled_balance(caller)?;
            if amount == 0 || amount > balance {
                return Err(RegistryError::NoBalance {
                    requested: amount,
                    available: balance,
                });
            }
            self.pay_out(&name, caller, amount)
        })
    }

    fn controlled_balance(&self, caller: Address) -> Result<(String, Amount), RegistryError> {
        let state = self.state();
        let name = state
            .name_of(&caller)
            .ok_or_else(|| RegistryError::AgentNotRegistered(caller.to_string()))?;
        let account = state
            .account(name)
            .ok_or_else(|| RegistryError::AgentNotRegistered(name.to_owned()))?;
        Ok((name.to_owned(), account.balance))
    }

    /// Replaces the balance of `name` with `f(balance)`, failing on overflow.
    fn adjust_balance(
        &self,
        name: &str,
        f: impl FnOnce(Amount) -> Option<Amount>,
    ) -> Result<(), RegistryError> {
        let balance = {
            let state = self.state();
            let account = state
                .account(name)
                .ok_or_else(|| RegistryError::AgentNotRegistered(name.to_owned()))?;
            f(account.balance).ok_or(RegistryError::AmountOverflow)?
        };
        if let Some(account) = self.state_mut().accounts.get_mut(name) {
            account.balance = balance;
        }
        Ok(())
    }

    /// Handle of the account `controller` held as `name` before an outbound
    /// transfer. The recipient may have renamed it while the transfer ran.
    fn current_handle(&self, name: &str, controller: Address) -> String {
        let state = self.state();
        match state.account(name) {
            Some(account) if account.controller == controller => name.to_owned(),
            _ => state
                .name_of(&controller)
                .map_or_else(|| name.to_owned(), str::to_owned),
        }
    }

    /// Debits `amount` from `name`, then sends it to `to`. Undone in full
    /// if the transfer is rejected.
    fn pay_out(&self, name: &str, to: Address, amount: Amount) -> Result<Amount, RegistryError> {
        self.adjust_balance(name, |balance| balance.checked_sub(amount))?;

        match self.dispatch(to, amount)? {
            TransferOutcome::Delivered => {
                let name = self.current_handle(name, to);
                info!(name = %name, controller = %to, amount = %format_units(amount), "withdrawal");
                self.record(|m| m.withdrawals_total.inc());
                self.emit(RegistryEvent::Withdrawn {
                    name,
                    controller: to,
                    amount,
                });
                Ok(amount)
            }
            TransferOutcome::Rejected(reason) => {
                self.adjust_balance(name, |balance| balance.checked_add(amount))?;
                warn!(name = %name, controller = %to, reason = %reason, "withdrawal rejected");
                Err(RegistryError::TransferFailed {
                    to,
                    amount,
                    reason,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Unsolicited value
    // -----------------------------------------------------------------------

    /// Handles value sent to the registry without naming a handle.
    ///
    /// The whole amount is forwarded to the fee sink; no handle is credited
    /// and no counter changes. A zero amount is a no-op.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ReentrantCall`], [`RegistryError::AmountOverflow`],
    /// or [`RegistryError::TransferFailed`] if the fee sink rejects it, in
    /// which case the value is not accepted.
    pub fn receive_unsolicited(&self, sender: Address, amount: Amount) -> Result<(), RegistryError> {
        self.guarded("receive_unsolicited", || {
            if amount == 0 {
                return Ok(());
            }
            let (fee_recipient, custodied) = {
                let state = self.state();
                (state.fee_recipient, add(state.custodied, amount)?)
            };
            self.state_mut().custodied = custodied;

            match self.dispatch(fee_recipient, amount)? {
                TransferOutcome::Delivered => {
                    info!(%sender, %fee_recipient, amount = %format_units(amount), "unsolicited value forwarded");
                    Ok(())
                }
                TransferOutcome::Rejected(reason) => {
                    {
                        let mut state = self.state_mut();
                        state.custodied = state
                            .custodied
                            .checked_sub(amount)
                            .ok_or(RegistryError::AmountOverflow)?;
                    }
                    warn!(%sender, %fee_recipient, reason = %reason, "unsolicited value bounced");
                    Err(RegistryError::TransferFailed {
                        to: fee_recipient,
                        amount,
                        reason,
                    })
                }
            }
        })
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Looks up a handle. Unregistered names resolve to the all-zero view.
    ///
    /// # Errors
    ///
    /// Any normalization error.
    pub fn resolve(&self, raw_name: &str) -> Result<AccountView, RegistryError> {
        let name = normalize(raw_name)?;
        Ok(self
            .state()
            .account(&name)
            .map(AccountView::from)
            .unwrap_or_default())
    }

    /// `true` if `raw_name` is valid and not registered.
    pub fn is_name_available(&self, raw_name: &str) -> bool {
        match normalize(raw_name) {
            Ok(name) => self.state().account(&name).is_none(),
            Err(_) => false,
        }
    }

    /// Handle controlled by `controller`, if any.
    pub fn name_of(&self, controller: Address) -> Option<String> {
        self.state().name_of(&controller).map(str::to_owned)
    }

    /// Number of first-time registrations.
    pub fn total_agents(&self) -> u64 {
        self.state().total_agents
    }

    /// Gross value ever tipped, fees included.
    pub fn total_tipped(&self) -> Amount {
        self.state().total_tipped
    }

    /// Fees delivered to the fee sink.
    pub fn total_fees_collected(&self) -> Amount {
        self.state().total_fees_collected
    }

    /// Native value currently held. Always the sum of all balances.
    pub fn custodied(&self) -> Amount {
        self.state().custodied
    }

    /// Audit events recorded so far, oldest first.
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.borrow().as_slice().to_vec()
    }

    /// Removes and returns recorded audit events.
    ///
    /// Returns nothing while an outbound transfer is in flight: events
    /// recorded during it are not final until the transfer is delivered.
    pub fn drain_events(&self) -> Vec<RegistryEvent> {
        if self.frames.depth() > 0 {
            debug!(depth = self.frames.depth(), "drain deferred during outbound transfer");
            return Vec::new();
        }
        self.events.borrow_mut().drain()
    }

    /// Copy of the complete registry state.
    pub fn snapshot(&self) -> RegistryState {
        self.state().clone()
    }

    /// Deterministic digest of the current state.
    pub fn state_root(&self) -> [u8; 32] {
        self.state().state_root()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn state(&self) -> Ref<'_, RegistryState> {
        self.state.borrow()
    }

    /// Mutable state access. Every write goes through here so open call
    /// frames can save their pre-call copy.
    fn state_mut(&self) -> RefMut<'_, RegistryState> {
        self.frames.before_mutation(&self.state.borrow());
        self.state.borrow_mut()
    }

    fn emit(&self, event: RegistryEvent) {
        self.events.borrow_mut().emit(event);
    }

    fn record(&self, f: impl FnOnce(&RegistryMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }

    /// Runs `op` under the reentrancy guard.
    fn guarded<R>(
        &self,
        operation: &'static str,
        op: impl FnOnce() -> Result<R, RegistryError>,
    ) -> Result<R, RegistryError> {
        let _lock = match self.guard.enter(operation) {
            Ok(lock) => lock,
            Err(e) => {
                debug!(operation, "reentrant call rejected");
                self.record(|m| m.reentrancy_rejections_total.inc());
                return Err(e);
            }
        };
        op()
    }

    /// Sends `amount` out of custody to `to`.
    ///
    /// Custody drops before the recipient runs. If the recipient rejects,
    /// every change made while it ran is discarded and custody is restored,
    /// leaving state exactly as it was before the call.
    fn dispatch(&self, to: Address, amount: Amount) -> Result<TransferOutcome, RegistryError> {
        {
            let mut state = self.state_mut();
            state.custodied = state
                .custodied
                .checked_sub(amount)
                .ok_or(RegistryError::AmountOverflow)?;
        }

        self.frames.open(self.events.borrow().len());
        let outcome = self.transfer.send_value(self, to, amount);
        let frame = self.frames.close();

        if let TransferOutcome::Rejected(reason) = &outcome {
            if let Some(frame) = frame {
                if let Some(saved) = frame.saved {
                    *self.state.borrow_mut() = saved;
                }
                self.events.borrow_mut().truncate(frame.events_len);
            }
            {
                let mut state = self.state_mut();
                state.custodied = add(state.custodied, amount)?;
            }
            self.record(|m| m.transfer_failures_total.inc());
            debug!(%to, reason = %reason, "outbound transfer rejected");
        }
        Ok(outcome)
    }
}

/// Post-tip values, computed with checked arithmetic before anything is
/// written.
struct TipEffects {
    balance: Amount,
    total_received: Amount,
    tip_count: u64,
    total_tipped: Amount,
    total_fees_collected: Amount,
    custodied: Amount,
}

fn add(a: Amount, b: Amount) -> Result<Amount, RegistryError> {
    a.checked_add(b).ok_or(RegistryError::AmountOverflow)
}
