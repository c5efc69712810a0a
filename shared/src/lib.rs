//! Shared types for Rally - game registration domain
//!
//! Pure domain crate: entity state machines, domain events and the
//! business-rule taxonomy. No I/O, no async - everything here can be
//! exercised from plain unit tests.

pub mod error;
pub mod game;
pub mod util;

// Re-exports
pub use error::RuleViolation;
pub use game::{
    EventPayload, Game, GameEvent, GameEventType, GameStatus, NewGame, PaymentStatus,
    Registration, RegistrationStatus,
};
pub use serde::{Deserialize, Serialize};
