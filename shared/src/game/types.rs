//! Game and Registration entities
//!
//! State transitions are one-directional: `Open -> Closed`,
//! `Open/Closed -> Finished`, any state `-> Canceled`, and nothing ever
//! leaves `Canceled`. A canceled registration never comes back either -
//! rejoining creates a fresh registration row (audit trail is append-only).

use serde::{Deserialize, Serialize};

use crate::error::RuleViolation;
use crate::util;

/// Game lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Open,
    Closed,
    Finished,
    Canceled,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameStatus::Open => write!(f, "open"),
            GameStatus::Closed => write!(f, "closed"),
            GameStatus::Finished => write!(f, "finished"),
            GameStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Registration status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Confirmed,
    Waitlisted,
    Canceled,
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationStatus::Confirmed => write!(f, "confirmed"),
            RegistrationStatus::Waitlisted => write!(f, "waitlisted"),
            RegistrationStatus::Canceled => write!(f, "canceled"),
        }
    }
}

/// Payment status - `Paid` is only reachable from a confirmed registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

/// Input for creating a new game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGame {
    pub organizer_id: String,
    pub venue_id: String,
    /// Start instant, Unix milliseconds UTC
    pub starts_at: i64,
    pub capacity: u32,
    pub level_tag: Option<String>,
    pub price_text: Option<String>,
}

/// Game aggregate root
///
/// Never deleted - terminal states (`Finished`, `Canceled`) are the only
/// way out of circulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Opaque unique ID (immutable)
    pub id: String,
    pub organizer_id: String,
    pub venue_id: String,
    /// Start instant, Unix milliseconds UTC
    pub starts_at: i64,
    /// Always > 0 (validated on creation)
    pub capacity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_text: Option<String>,
    pub status: GameStatus,
    pub created_at: i64,
}

impl Game {
    /// Construct a new open game. Capacity must already be validated (> 0).
    pub fn new(input: NewGame) -> Self {
        Self {
            id: util::new_id(),
            organizer_id: input.organizer_id,
            venue_id: input.venue_id,
            starts_at: input.starts_at,
            capacity: input.capacity,
            level_tag: input.level_tag,
            price_text: input.price_text,
            status: GameStatus::Open,
            created_at: util::now_millis(),
        }
    }

    /// Can a confirmed registration be committed right now?
    ///
    /// The single centralized check: game open, start strictly in the
    /// future, and a free confirmed slot. Waitlist assignments skip this
    /// entirely (the rule lives at confirmation time, nowhere else).
    pub fn ensure_confirmable(&self, confirmed_count: u32, now: i64) -> Result<(), RuleViolation> {
        if self.status != GameStatus::Open {
            return Err(RuleViolation::GameNotOpen);
        }
        if now >= self.starts_at {
            return Err(RuleViolation::GameAlreadyStarted);
        }
        if confirmed_count >= self.capacity {
            return Err(RuleViolation::CapacityReached);
        }
        Ok(())
    }

    /// Is the payment window open? Opens at game start, on an open or
    /// finished game.
    pub fn ensure_payment_window(&self, now: i64) -> Result<(), RuleViolation> {
        if now < self.starts_at {
            return Err(RuleViolation::PaymentWindowNotOpen);
        }
        match self.status {
            GameStatus::Open | GameStatus::Finished => Ok(()),
            GameStatus::Closed | GameStatus::Canceled => Err(RuleViolation::PaymentWindowNotOpen),
        }
    }

    /// `Open -> Closed`
    pub fn close(&mut self) -> Result<(), RuleViolation> {
        match self.status {
            GameStatus::Open => {
                self.status = GameStatus::Closed;
                Ok(())
            }
            _ => Err(RuleViolation::GameNotOpen),
        }
    }

    /// `Open/Closed -> Finished`
    pub fn finish(&mut self) -> Result<(), RuleViolation> {
        match self.status {
            GameStatus::Open | GameStatus::Closed => {
                self.status = GameStatus::Finished;
                Ok(())
            }
            _ => Err(RuleViolation::GameNotOpen),
        }
    }

    /// Any state `-> Canceled`. Idempotent: canceling a canceled game is
    /// a no-op and reports `false` (no state change to publish).
    pub fn cancel(&mut self) -> bool {
        if self.status == GameStatus::Canceled {
            return false;
        }
        self.status = GameStatus::Canceled;
        true
    }
}

/// Registration - one player's claim on a game slot
///
/// `joined_seq` is a globally monotonic counter assigned inside the join
/// transaction; it is the FIFO key for waitlist promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Opaque unique ID
    pub id: String,
    pub game_id: String,
    pub player_id: String,
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_marked_at: Option<i64>,
    /// Creation order (FIFO key for promotion)
    pub joined_seq: u64,
    pub created_at: i64,
}

impl Registration {
    pub fn new(
        game_id: impl Into<String>,
        player_id: impl Into<String>,
        status: RegistrationStatus,
        joined_seq: u64,
    ) -> Self {
        Self {
            id: util::new_id(),
            game_id: game_id.into(),
            player_id: player_id.into(),
            status,
            payment_status: PaymentStatus::Unpaid,
            payment_marked_at: None,
            joined_seq,
            created_at: util::now_millis(),
        }
    }

    /// Active = still holds or waits for a slot
    pub fn is_active(&self) -> bool {
        self.status != RegistrationStatus::Canceled
    }

    /// Mark canceled. Reports `false` when already canceled (no-op).
    pub fn cancel(&mut self) -> bool {
        if self.status == RegistrationStatus::Canceled {
            return false;
        }
        self.status = RegistrationStatus::Canceled;
        true
    }

    /// Promote a waitlisted registration to confirmed.
    ///
    /// Reports `false` when the registration is no longer waitlisted -
    /// the caller must re-check immediately before promoting (a canceled
    /// registration never transitions back).
    pub fn promote(&mut self) -> bool {
        if self.status != RegistrationStatus::Waitlisted {
            return false;
        }
        self.status = RegistrationStatus::Confirmed;
        true
    }

    /// Mark paid at `now`.
    ///
    /// Returns `Ok(true)` on first payment, `Ok(false)` when already paid
    /// (timestamp untouched), `Err(NotConfirmed)` otherwise - paid implies
    /// confirmed, always.
    pub fn mark_paid(&mut self, now: i64) -> Result<bool, RuleViolation> {
        if self.status != RegistrationStatus::Confirmed {
            return Err(RuleViolation::NotConfirmed);
        }
        if self.payment_status == PaymentStatus::Paid {
            return Ok(false);
        }
        self.payment_status = PaymentStatus::Paid;
        self.payment_marked_at = Some(now);
        Ok(true)
    }
}
