//! Game registration domain - entities and domain events
//!
//! A `Game` is a capacity-limited, time-boxed session; a `Registration`
//! is one player's claim on a slot. Both are plain state machines - the
//! registration engine (rally-server) is their only writer.

pub mod events;
pub mod types;

pub use events::{EventPayload, GameEvent, GameEventType};
pub use types::{Game, GameStatus, NewGame, PaymentStatus, Registration, RegistrationStatus};
