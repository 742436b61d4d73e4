//! # Audit Events
//!
//! Every successful state change appends exactly one event to the registry's
//! log. Events produced inside a nested call that is later undone are removed
//! together with the state they describe, so the log never mentions a change
//! that did not stick.

use serde::{Deserialize, Serialize};
use tipjar_protocol::clock::Timestamp;
use tipjar_protocol::config::Amount;
use tipjar_protocol::identity::Address;

/// A durable audit record of one state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryEvent {
    /// A controller registered its first handle.
    AgentRegistered {
        /// Normalized handle.
        name: String,
        /// Controlling address.
        controller: Address,
        /// Registration time.
        registered_at: Timestamp,
    },

    /// A handle changed name or controller.
    ///
    /// A rename has `old_name != new_name` and the same controller on both
    /// sides; a controller update has the same name and different
    /// controllers.
    AgentUpdated {
        /// Handle before the change.
        old_name: String,
        /// Handle after the change.
        new_name: String,
        /// Controller before the change.
        old_controller: Address,
        /// Controller after the change.
        new_controller: Address,
    },

    /// A handle was tipped.
    Tipped {
        /// Handle credited, as bound once the fee transfer has run.
        name: String,
        /// Tipping address.
        sender: Address,
        /// Amount credited after the fee.
        net_amount: Amount,
        /// Intended protocol fee, reported even if it was refunded to the
        /// handle because the fee sink rejected it.
        fee: Amount,
    },

    /// A controller withdrew value.
    Withdrawn {
        /// Handle withdrawn from, as bound once the payout has run.
        name: String,
        /// Receiving controller.
        controller: Address,
        /// Amount transferred.
        amount: Amount,
    },

    /// The fee sink was changed.
    FeeRecipientChanged {
        /// Previous fee sink.
        old_recipient: Address,
        /// New fee sink.
        new_recipient: Address,
    },

    /// A tip fee reached the fee sink.
    FeesCollected {
        /// Fee sink that received the fee.
        recipient: Address,
        /// Fee amount.
        amount: Amount,
    },

    /// The owner nominated a successor.
    OwnershipTransferStarted {
        /// Current owner.
        previous_owner: Address,
        /// Nominated successor (null address cancels).
        new_owner: Address,
    },

    /// The nominated successor accepted ownership.
    OwnershipTransferred {
        /// Owner before acceptance.
        previous_owner: Address,
        /// Owner after acceptance.
        new_owner: Address,
    },

    /// The registry was paused.
    Paused {
        /// Owner who paused it.
        by: Address,
    },

    /// The registry was unpaused.
    Unpaused {
        /// Owner who unpaused it.
        by: Address,
    },
}

impl RegistryEvent {
    /// Short event name, mainly for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryEvent::AgentRegistered { .. } => "agent_registered",
            RegistryEvent::AgentUpdated { .. } => "agent_updated",
            RegistryEvent::Tipped { .. } => "tipped",
            RegistryEvent::Withdrawn { .. } => "withdrawn",
            RegistryEvent::FeeRecipientChanged { .. } => "fee_recipient_changed",
            RegistryEvent::FeesCollected { .. } => "fees_collected",
            RegistryEvent::OwnershipTransferStarted { .. } => "ownership_transfer_started",
            RegistryEvent::OwnershipTransferred { .. } => "ownership_transferred",
            RegistryEvent::Paused { .. } => "paused",
            RegistryEvent::Unpaused { .. } => "unpaused",
        }
    }

    /// Renders the event as a single JSON line for an external audit sink.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Append-only event log with truncation for undoing nested calls.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<RegistryEvent>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn emit(&mut self, event: RegistryEvent) {
        tracing::trace!(kind = event.kind(), "event emitted");
        self.events.push(event);
    }

    /// Number of events recorded.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events are recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drops every event recorded after position `len`.
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Recorded events, oldest first.
    pub fn as_slice(&self) -> &[RegistryEvent] {
        &self.events
    }

    /// Removes and returns every recorded event.
    pub fn drain(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }
}
