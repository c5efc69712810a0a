//! Business-rule taxonomy
//!
//! Every rule the registration engine can refuse an operation for, as a
//! flat tagged enum. Stable codes are surfaced verbatim at the API
//! boundary; retryability is a per-variant lookup (rule violations are
//! never retried automatically).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A domain rule the caller ran into. Caller-correctable, never retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RuleViolation {
    /// Game is not accepting confirmed registrations (closed/finished/canceled)
    #[error("game is not open")]
    GameNotOpen,

    /// Game start time is already in the past
    #[error("game has already started")]
    GameAlreadyStarted,

    /// Confirmed registrations already fill the capacity
    #[error("game capacity reached")]
    CapacityReached,

    /// Payment can only be marked from game start onward, on an open or finished game
    #[error("payment window is not open")]
    PaymentWindowNotOpen,

    /// Registration is missing, waitlisted or canceled - payment requires confirmed
    #[error("registration is not confirmed")]
    NotConfirmed,
}

impl RuleViolation {
    /// Stable error code (wire contract - do not rename)
    pub const fn code(self) -> &'static str {
        match self {
            RuleViolation::GameNotOpen => "game_not_open",
            RuleViolation::GameAlreadyStarted => "game_already_started",
            RuleViolation::CapacityReached => "capacity_reached",
            RuleViolation::PaymentWindowNotOpen => "payment_window_not_open",
            RuleViolation::NotConfirmed => "not_confirmed",
        }
    }

    /// Rule violations are deterministic - retrying the same call cannot succeed
    pub const fn is_retryable(self) -> bool {
        false
    }
}
