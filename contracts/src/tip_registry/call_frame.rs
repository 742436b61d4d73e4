//! # Nested Call Frames
//!
//! An outbound transfer runs recipient code, and that code may change
//! registry state through unguarded entry points (register, re-point).
//! When the transfer is rejected, everything the recipient did must be
//! undone along with it, events included.
//!
//! A frame is opened right before the transfer. The first mutation inside
//! the frame saves a copy of the state; a frame nobody mutated in costs
//! nothing. Closing a rejected frame hands back the saved copy, if any, and
//! the event log length to truncate to.

use std::cell::RefCell;

use super::state::RegistryState;

/// Pre-call snapshot for one outbound transfer.
#[derive(Debug)]
pub struct CallFrame {
    /// State as it was when the frame opened, saved on first mutation.
    pub saved: Option<RegistryState>,
    /// Event log length when the frame opened.
    pub events_len: usize,
}

/// Stack of open frames.
#[derive(Debug, Default)]
pub struct CallFrames {
    frames: RefCell<Vec<CallFrame>>,
}

impl CallFrames {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a frame at the current event log position.
    pub fn open(&self, events_len: usize) {
        self.frames.borrow_mut().push(CallFrame {
            saved: None,
            events_len,
        });
    }

    /// Must run before every state mutation. Frames that have not saved a
    /// copy yet were opened with no mutation since, so `current` is exactly
    /// their pre-call state.
    pub fn before_mutation(&self, current: &RegistryState) {
        for frame in self.frames.borrow_mut().iter_mut() {
            if frame.saved.is_none() {
                frame.saved = Some(current.clone());
            }
        }
    }

    /// Closes the innermost frame.
    pub fn close(&self) -> Option<CallFrame> {
        self.frames.borrow_mut().pop()
    }

    /// Number of open frames.
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}
