//! # Administration
//!
//! Owner-gated operations. Every one starts with an explicit capability
//! check (caller == current owner); there is no implicit owner state.
//!
//! Ownership moves in two steps: the owner nominates a successor, and the
//! successor must accept. Until acceptance the old owner keeps full control
//! and can re-nominate or cancel with the null address.
//!
//! While paused, registration, re-pointing, tipping and withdrawal fail with
//! [`RegistryError::EnforcedPause`]. Reads and admin operations keep working.

use tipjar_protocol::identity::Address;
use tracing::info;

use super::error::RegistryError;
use super::events::RegistryEvent;
use super::TipRegistry;

impl TipRegistry {
    /// Current owner.
    pub fn owner(&self) -> Address {
        self.state().owner
    }

    /// Nominated successor awaiting acceptance.
    pub fn pending_owner(&self) -> Option<Address> {
        self.state().pending_owner
    }

    /// Whether the registry is paused.
    pub fn paused(&self) -> bool {
        self.state().paused
    }

    /// Current fee sink.
    pub fn fee_recipient(&self) -> Address {
        self.state().fee_recipient
    }

    /// Points protocol fees at a new sink.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] or [`RegistryError::InvalidRecipient`].
    pub fn set_fee_recipient(&self, caller: Address, recipient: Address) -> Result<(), RegistryError> {
        self.only_owner(caller)?;
        if recipient.is_zero() {
            return Err(RegistryError::InvalidRecipient);
        }

        let old_recipient = {
            let mut state = self.state_mut();
            std::mem::replace(&mut state.fee_recipient, recipient)
        };
        info!(%old_recipient, new_recipient = %recipient, "fee recipient changed");
        self.emit(RegistryEvent::FeeRecipientChanged {
            old_recipient,
            new_recipient: recipient,
        });
        Ok(())
    }

    /// Pauses registration, tipping, withdrawal and re-pointing.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] or [`RegistryError::EnforcedPause`]
    /// if already paused.
    pub fn pause(&self, caller: Address) -> Result<(), RegistryError> {
        self.only_owner(caller)?;
        if self.paused() {
            return Err(RegistryError::EnforcedPause);
        }
        self.state_mut().paused = true;
        info!(by = %caller, "registry paused");
        self.emit(RegistryEvent::Paused { by: caller });
        Ok(())
    }

    /// Lifts a pause.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] or [`RegistryError::ExpectedPause`]
    /// if not paused.
    pub fn unpause(&self, caller: Address) -> Result<(), RegistryError> {
        self.only_owner(caller)?;
        if !self.paused() {
            return Err(RegistryError::ExpectedPause);
        }
        self.state_mut().paused = false;
        info!(by = %caller, "registry unpaused");
        self.emit(RegistryEvent::Unpaused { by: caller });
        Ok(())
    }

    /// Nominates `new_owner` as successor. The null address cancels a
    /// pending nomination.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`].
    pub fn transfer_ownership(&self, caller: Address, new_owner: Address) -> Result<(), RegistryError> {
        self.only_owner(caller)?;
        self.state_mut().pending_owner = (!new_owner.is_zero()).then_some(new_owner);
        info!(previous_owner = %caller, %new_owner, "ownership transfer started");
        self.emit(RegistryEvent::OwnershipTransferStarted {
            previous_owner: caller,
            new_owner,
        });
        Ok(())
    }

    /// Completes a transfer started by [`transfer_ownership`](Self::transfer_ownership).
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unauthorized`] unless `caller` is the nominee.
    pub fn accept_ownership(&self, caller: Address) -> Result<(), RegistryError> {
        if self.pending_owner() != Some(caller) {
            return Err(RegistryError::Unauthorized { caller });
        }
        let previous_owner = {
            let mut state = self.state_mut();
            state.pending_owner = None;
            std::mem::replace(&mut state.owner, caller)
        };
        info!(%previous_owner, new_owner = %caller, "ownership transferred");
        self.emit(RegistryEvent::OwnershipTransferred {
            previous_owner,
            new_owner: caller,
        });
        Ok(())
    }

    fn only_owner(&self, caller: Address) -> Result<(), RegistryError> {
        if caller != self.owner() {
            return Err(RegistryError::Unauthorized { caller });
        }
        Ok(())
    }

    pub(super) fn when_not_paused(&self) -> Result<(), RegistryError> {
        if self.paused() {
            self.record(|m| m.paused_rejections_total.inc());
            return Err(RegistryError::EnforcedPause);
        }
        Ok(())
    }
}
