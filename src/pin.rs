//! Reusable PIN challenge gating sensitive actions.
//!
//! The gate compares a 4-digit entry against the stored transaction PIN from
//! the customer profile and enforces a retry lockout: the third consecutive
//! mismatch locks the gate for 30 seconds, counted down one [`tick`] at a
//! time. All state is per-instance; dropping the gate and constructing a new
//! one is "dismiss and reopen" and forgets everything.
//!
//! [`tick`]: PinGate::tick

use thiserror::Error;
use tracing::warn;

/// Maximum consecutive mismatches before the gate locks.
pub const MAX_ATTEMPTS: u8 = 3;

/// Lockout duration in seconds.
pub const LOCKOUT_SECS: u32 = 30;

const PIN_LEN: usize = 4;

/// Observable state of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// The account has no PIN configured. Terminal: no input is accepted
    /// and verification can never occur.
    NoPinConfigured,
    AwaitingInput,
    Locked { remaining_secs: u32 },
    Verified,
}

/// Errors surfaced to the hosting dialog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinError {
    #[error("no transaction PIN is configured")]
    NoPinConfigured,

    #[error("incorrect PIN, {remaining} attempts remaining")]
    Mismatch { remaining: u8 },

    #[error("too many failed attempts, retry in {remaining_secs} seconds")]
    Locked { remaining_secs: u32 },

    #[error("enter exactly 4 digits")]
    IncompleteInput,

    #[error("PIN already verified")]
    AlreadyVerified,
}

/// The PIN gate. The stored PIN is sourced from the profile record; the gate
/// only compares against it and never persists anything.
#[derive(Debug)]
pub struct PinGate {
    stored: Option<String>,
    buffer: String,
    attempts: u8,
    lock_remaining: Option<u32>,
    verified: bool,
}

impl PinGate {
    pub fn new(stored_pin: Option<impl Into<String>>) -> Self {
        Self {
            stored: stored_pin.map(Into::into),
            buffer: String::new(),
            attempts: 0,
            lock_remaining: None,
            verified: false,
        }
    }

    pub fn state(&self) -> GateState {
        if self.stored.is_none() {
            GateState::NoPinConfigured
        } else if self.verified {
            GateState::Verified
        } else if let Some(remaining_secs) = self.lock_remaining {
            GateState::Locked { remaining_secs }
        } else {
            GateState::AwaitingInput
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// The digits currently buffered (echoed masked by the dialog).
    pub fn entered(&self) -> &str {
        &self.buffer
    }

    /// Replace the buffered entry. Non-digit characters are stripped rather
    /// than rejected, and the entry is capped at 4 digits.
    pub fn input(&mut self, text: &str) -> Result<(), PinError> {
        self.refuse_if_inactive()?;
        self.buffer = text
            .chars()
            .filter(char::is_ascii_digit)
            .take(PIN_LEN)
            .collect();
        Ok(())
    }

    /// Compare the buffered entry against the stored PIN.
    ///
    /// A match verifies the gate exactly once and clears all local state; a
    /// mismatch increments the attempt counter, and the third consecutive
    /// mismatch locks the gate for [`LOCKOUT_SECS`]. Either way the buffer
    /// is cleared.
    pub fn submit(&mut self) -> Result<(), PinError> {
        self.refuse_if_inactive()?;
        if self.buffer.len() != PIN_LEN {
            return Err(PinError::IncompleteInput);
        }

        let entry = std::mem::take(&mut self.buffer);
        // refuse_if_inactive ruled out the no-PIN state
        let stored = self.stored.as_deref().unwrap_or_default();
        if entry == stored {
            self.verified = true;
            self.attempts = 0;
            Ok(())
        } else {
            self.attempts += 1;
            if self.attempts >= MAX_ATTEMPTS {
                self.lock_remaining = Some(LOCKOUT_SECS);
                warn!(attempts = self.attempts, "PIN gate locked");
                Err(PinError::Locked {
                    remaining_secs: LOCKOUT_SECS,
                })
            } else {
                Err(PinError::Mismatch {
                    remaining: MAX_ATTEMPTS - self.attempts,
                })
            }
        }
    }

    /// One-second countdown pulse. When the lockout reaches zero the gate
    /// returns to awaiting input with the attempt counter reset. The hosting
    /// dialog cancels its ticker when it unmounts, so the countdown never
    /// outlives the gate.
    pub fn tick(&mut self) {
        if let Some(remaining) = self.lock_remaining {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                self.lock_remaining = None;
                self.attempts = 0;
            } else {
                self.lock_remaining = Some(remaining);
            }
        }
    }

    fn refuse_if_inactive(&self) -> Result<(), PinError> {
        if self.stored.is_none() {
            return Err(PinError::NoPinConfigured);
        }
        if self.verified {
            return Err(PinError::AlreadyVerified);
        }
        if let Some(remaining_secs) = self.lock_remaining {
            return Err(PinError::Locked { remaining_secs });
        }
        Ok(())
    }
}
