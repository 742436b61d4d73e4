//! Error types for the tip registry.
//!
//! Every registry operation that can fail returns a [`RegistryError`]. Each
//! variant is a distinct, named failure; nothing is folded into a generic
//! catch-all.

use thiserror::Error;
use tipjar_protocol::config::Amount;
use tipjar_protocol::identity::Address;

/// Errors that can occur during tip registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name is empty after normalization.
    #[error("name too short: a handle needs at least one character")]
    NameTooShort,

    /// The name exceeds the maximum handle length.
    #[error("name too long: {len} bytes, maximum is {max}")]
    NameTooLong {
        /// Length of the offending name in bytes.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// The name contains a byte outside `[A-Za-z0-9_-]`.
    #[error("invalid name: byte 0x{byte:02x} at position {position} is not allowed")]
    InvalidName {
        /// The offending byte.
        byte: u8,
        /// Its position in the raw name.
        position: usize,
    },

    /// The name is already bound to a controller.
    #[error("name already taken: {0}")]
    NameAlreadyTaken(String),

    /// No handle is bound to the given name or address.
    #[error("agent not registered: {0}")]
    AgentNotRegistered(String),

    /// The tip is below the protocol minimum.
    #[error("tip too small: {amount} is below the minimum of {minimum}")]
    TipTooSmall {
        /// Amount the caller tried to tip.
        amount: Amount,
        /// Minimum accepted tip.
        minimum: Amount,
    },

    /// The tipper controls the handle being tipped.
    #[error("cannot tip your own handle")]
    CannotTipSelf,

    /// Nothing to withdraw, or the requested amount exceeds the balance.
    #[error("no balance: requested {requested}, available {available}")]
    NoBalance {
        /// Amount the caller tried to withdraw.
        requested: Amount,
        /// Current withdrawable balance.
        available: Amount,
    },

    /// The recipient of an outbound value transfer rejected it.
    #[error("transfer of {amount} to {to} failed: {reason}")]
    TransferFailed {
        /// Intended recipient.
        to: Address,
        /// Amount that could not be delivered.
        amount: Amount,
        /// Reason reported by the value transfer.
        reason: String,
    },

    /// The null address was supplied where a real one is required.
    #[error("invalid recipient: the null address cannot control or receive value")]
    InvalidRecipient,

    /// The target address already controls another handle.
    #[error("controller already bound: {address} controls '{name}'")]
    ControllerAlreadyBound {
        /// The address that was to become controller.
        address: Address,
        /// The name it already controls.
        name: String,
    },

    /// The caller does not hold the required capability.
    #[error("unauthorized: {caller} is not permitted to perform this operation")]
    Unauthorized {
        /// The address that attempted the operation.
        caller: Address,
    },

    /// The registry is paused.
    #[error("registry is paused")]
    EnforcedPause,

    /// The registry is not paused.
    #[error("registry is not paused")]
    ExpectedPause,

    /// A guarded operation was entered while another one is still running.
    #[error("reentrant call to {operation} rejected")]
    ReentrantCall {
        /// The operation that was re-entered.
        operation: &'static str,
    },

    /// A value counter would overflow.
    #[error("amount overflow: operation would exceed allowed limits")]
    AmountOverflow,

    /// A state snapshot could not be decoded or fails integrity checks.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}
