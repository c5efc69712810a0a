//! Domain events
//!
//! Every state change the engine or scheduler commits is announced as an
//! immutable `GameEvent`. Payload field names are wire-stable (camelCase,
//! games addressed as `eventId`) - downstream consumers serialize them
//! as-is, so renaming a field here is a breaking change.

use serde::{Deserialize, Serialize};

use crate::util;

/// Event type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameEventType {
    PlayerJoined,
    RegistrationCanceled,
    WaitlistedPromoted,
    PaymentMarked,
    PaymentAttemptRejectedEarly,
    EventCreated,
    EventClosed,
    EventCanceled,
    EventFinished,
    GameReminder24h,
    GameReminder2h,
    PaymentReminder12h,
    PaymentReminder24h,
}

/// Type-specific payload, tagged by event type on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    PlayerJoined {
        #[serde(rename = "eventId")]
        game_id: String,
        #[serde(rename = "participantId")]
        player_id: String,
        status: String,
    },
    RegistrationCanceled {
        #[serde(rename = "eventId")]
        game_id: String,
        #[serde(rename = "participantId")]
        player_id: String,
    },
    WaitlistedPromoted {
        #[serde(rename = "eventId")]
        game_id: String,
        #[serde(rename = "participantId")]
        player_id: String,
    },
    PaymentMarked {
        #[serde(rename = "eventId")]
        game_id: String,
        #[serde(rename = "participantId")]
        player_id: String,
    },
    PaymentAttemptRejectedEarly {
        #[serde(rename = "eventId")]
        game_id: String,
        #[serde(rename = "participantId")]
        player_id: String,
    },
    EventCreated {
        #[serde(rename = "eventId")]
        game_id: String,
        #[serde(rename = "startsAt")]
        starts_at: i64,
        capacity: u32,
        #[serde(rename = "levelTag", skip_serializing_if = "Option::is_none")]
        level_tag: Option<String>,
        #[serde(rename = "priceText", skip_serializing_if = "Option::is_none")]
        price_text: Option<String>,
    },
    EventClosed {
        #[serde(rename = "eventId")]
        game_id: String,
    },
    EventCanceled {
        #[serde(rename = "eventId")]
        game_id: String,
    },
    EventFinished {
        #[serde(rename = "eventId")]
        game_id: String,
    },
    GameReminder24h {
        #[serde(rename = "eventId")]
        game_id: String,
    },
    GameReminder2h {
        #[serde(rename = "eventId")]
        game_id: String,
    },
    PaymentReminder12h {
        #[serde(rename = "eventId")]
        game_id: String,
    },
    PaymentReminder24h {
        #[serde(rename = "eventId")]
        game_id: String,
    },
}

impl EventPayload {
    /// ID of the game this payload refers to
    pub fn game_id(&self) -> &str {
        match self {
            EventPayload::PlayerJoined { game_id, .. }
            | EventPayload::RegistrationCanceled { game_id, .. }
            | EventPayload::WaitlistedPromoted { game_id, .. }
            | EventPayload::PaymentMarked { game_id, .. }
            | EventPayload::PaymentAttemptRejectedEarly { game_id, .. }
            | EventPayload::EventCreated { game_id, .. }
            | EventPayload::EventClosed { game_id }
            | EventPayload::EventCanceled { game_id }
            | EventPayload::EventFinished { game_id }
            | EventPayload::GameReminder24h { game_id }
            | EventPayload::GameReminder2h { game_id }
            | EventPayload::PaymentReminder12h { game_id }
            | EventPayload::PaymentReminder24h { game_id } => game_id,
        }
    }

    fn event_type(&self) -> GameEventType {
        match self {
            EventPayload::PlayerJoined { .. } => GameEventType::PlayerJoined,
            EventPayload::RegistrationCanceled { .. } => GameEventType::RegistrationCanceled,
            EventPayload::WaitlistedPromoted { .. } => GameEventType::WaitlistedPromoted,
            EventPayload::PaymentMarked { .. } => GameEventType::PaymentMarked,
            EventPayload::PaymentAttemptRejectedEarly { .. } => {
                GameEventType::PaymentAttemptRejectedEarly
            }
            EventPayload::EventCreated { .. } => GameEventType::EventCreated,
            EventPayload::EventClosed { .. } => GameEventType::EventClosed,
            EventPayload::EventCanceled { .. } => GameEventType::EventCanceled,
            EventPayload::EventFinished { .. } => GameEventType::EventFinished,
            EventPayload::GameReminder24h { .. } => GameEventType::GameReminder24h,
            EventPayload::GameReminder2h { .. } => GameEventType::GameReminder2h,
            EventPayload::PaymentReminder12h { .. } => GameEventType::PaymentReminder12h,
            EventPayload::PaymentReminder24h { .. } => GameEventType::PaymentReminder24h,
        }
    }
}

/// Immutable domain event record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Unique event ID
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: GameEventType,
    /// Emission instant, Unix milliseconds UTC
    #[serde(rename = "occurredAt")]
    pub occurred_at: i64,
    pub payload: EventPayload,
}

impl GameEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: util::new_id(),
            event_type: payload.event_type(),
            occurred_at: util::now_millis(),
            payload,
        }
    }

    pub fn player_joined(
        game_id: impl Into<String>,
        player_id: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self::new(EventPayload::PlayerJoined {
            game_id: game_id.into(),
            player_id: player_id.into(),
            status: status.into(),
        })
    }

    pub fn registration_canceled(
        game_id: impl Into<String>,
        player_id: impl Into<String>,
    ) -> Self {
        Self::new(EventPayload::RegistrationCanceled {
            game_id: game_id.into(),
            player_id: player_id.into(),
        })
    }

    pub fn waitlisted_promoted(game_id: impl Into<String>, player_id: impl Into<String>) -> Self {
        Self::new(EventPayload::WaitlistedPromoted {
            game_id: game_id.into(),
            player_id: player_id.into(),
        })
    }

    pub fn payment_marked(game_id: impl Into<String>, player_id: impl Into<String>) -> Self {
        Self::new(EventPayload::PaymentMarked {
            game_id: game_id.into(),
            player_id: player_id.into(),
        })
    }

    pub fn payment_attempt_rejected_early(
        game_id: impl Into<String>,
        player_id: impl Into<String>,
    ) -> Self {
        Self::new(EventPayload::PaymentAttemptRejectedEarly {
            game_id: game_id.into(),
            player_id: player_id.into(),
        })
    }

    pub fn event_created(game: &super::Game) -> Self {
        Self::new(EventPayload::EventCreated {
            game_id: game.id.clone(),
            starts_at: game.starts_at,
            capacity: game.capacity,
            level_tag: game.level_tag.clone(),
            price_text: game.price_text.clone(),
        })
    }

    pub fn event_closed(game_id: impl Into<String>) -> Self {
        Self::new(EventPayload::EventClosed {
            game_id: game_id.into(),
        })
    }

    pub fn event_canceled(game_id: impl Into<String>) -> Self {
        Self::new(EventPayload::EventCanceled {
            game_id: game_id.into(),
        })
    }

    pub fn event_finished(game_id: impl Into<String>) -> Self {
        Self::new(EventPayload::EventFinished {
            game_id: game_id.into(),
        })
    }

    pub fn game_reminder_24h(game_id: impl Into<String>) -> Self {
        Self::new(EventPayload::GameReminder24h {
            game_id: game_id.into(),
        })
    }

    pub fn game_reminder_2h(game_id: impl Into<String>) -> Self {
        Self::new(EventPayload::GameReminder2h {
            game_id: game_id.into(),
        })
    }

    pub fn payment_reminder_12h(game_id: impl Into<String>) -> Self {
        Self::new(EventPayload::PaymentReminder12h {
            game_id: game_id.into(),
        })
    }

    pub fn payment_reminder_24h(game_id: impl Into<String>) -> Self {
        Self::new(EventPayload::PaymentReminder24h {
            game_id: game_id.into(),
        })
    }
}
