//! Registration engine
//!
//! Sole writer of game and registration state. Every operation follows the
//! same shape: run the state change inside one repository unit of work,
//! then publish the resulting domain events only after the transaction has
//! committed - a subscriber must never react to a change that could still
//! be rolled back.
//!
//! The unit of work is also the serialization point for capacity
//! enforcement: the confirmed-count read and the registration write commit
//! atomically, so two concurrent joiners cannot both win the last slot.

use shared::util::now_millis;
use shared::{Game, GameEvent, GameStatus, NewGame, Registration, RegistrationStatus, RuleViolation};
use std::sync::Arc;

use crate::bus::EventBus;
use crate::db::{GameRepository, GameTxn};

pub mod error;
#[cfg(test)]
mod tests;

pub use error::{EngineError, EngineResult};

/// Outcome of a payment attempt, carried out of the transaction so the
/// rejection event can be published after commit
enum PayOutcome {
    Marked,
    AlreadyPaid,
    RejectedEarly,
}

pub struct RegistrationEngine<R: GameRepository> {
    repo: Arc<R>,
    bus: Arc<EventBus>,
}

impl<R: GameRepository> RegistrationEngine<R> {
    pub fn new(repo: Arc<R>, bus: Arc<EventBus>) -> Self {
        Self { repo, bus }
    }

    /// Create a new game in open status
    pub async fn create(&self, input: NewGame) -> EngineResult<Game> {
        if input.capacity == 0 {
            return Err(EngineError::Validation("capacity must be positive".into()));
        }

        let game = Game::new(input);
        let events = self.repo.transaction(|txn| {
            txn.insert_game(&game)?;
            Ok::<_, EngineError>(vec![GameEvent::event_created(&game)])
        })?;

        tracing::info!(game_id = %game.id, starts_at = game.starts_at, capacity = game.capacity, "game created");
        self.bus.publish_all(&events).await;
        Ok(game)
    }

    /// Join a game: confirmed while capacity lasts, waitlisted after.
    ///
    /// Idempotent per (game, player): a repeated call on a still-active
    /// registration returns its current status without writing a second
    /// row. The confirmed/waitlisted decision is computed from the
    /// confirmed count read inside the same transaction that writes the
    /// registration.
    pub async fn join(&self, game_id: &str, player_id: &str) -> EngineResult<RegistrationStatus> {
        let (status, events) = self.repo.transaction(|txn| {
            let game = txn
                .find_game(game_id)?
                .ok_or_else(|| EngineError::NotFound(game_id.to_string()))?;

            if let Some(existing) = txn.get_registration(game_id, player_id)? {
                return Ok::<_, EngineError>((existing.status, Vec::new()));
            }

            let confirmed = txn.count_confirmed(game_id)?;
            let status = if confirmed < game.capacity {
                // Full invariant check on the confirmed path
                game.ensure_confirmable(confirmed, now_millis())?;
                RegistrationStatus::Confirmed
            } else {
                // Waitlist skips the future-time check; the rule lives at
                // confirmation time
                if game.status != GameStatus::Open {
                    return Err(RuleViolation::GameNotOpen.into());
                }
                RegistrationStatus::Waitlisted
            };

            let seq = txn.next_join_seq()?;
            let registration = Registration::new(game_id, player_id, status, seq);
            txn.upsert_registration(&registration)?;

            Ok((
                status,
                vec![GameEvent::player_joined(game_id, player_id, status.to_string())],
            ))
        })?;

        self.bus.publish_all(&events).await;
        Ok(status)
    }

    /// Leave a game. No-op success when nothing is active.
    ///
    /// Cancel and waitlist promotion are one transaction: a crash between
    /// them must not leave a permanently open confirmed slot, and the FIFO
    /// head is re-checked as still waitlisted immediately before the
    /// promotion write.
    pub async fn leave(&self, game_id: &str, player_id: &str) -> EngineResult<()> {
        let events = self.repo.transaction(|txn| {
            let Some(mut registration) = txn.get_registration(game_id, player_id)? else {
                return Ok::<_, EngineError>(Vec::new());
            };

            let freed_slot = registration.status == RegistrationStatus::Confirmed;
            registration.cancel();
            txn.upsert_registration(&registration)?;

            let mut events = vec![GameEvent::registration_canceled(game_id, player_id)];

            // Only a canceled confirmed registration frees a slot; a
            // waitlisted leaver promotes nobody
            if freed_slot
                && let Some(head) = txn.first_waitlisted(game_id)?
                && txn.promote_to_confirmed(game_id, head.joined_seq)?
            {
                events.push(GameEvent::waitlisted_promoted(game_id, &head.player_id));
            }

            Ok(events)
        })?;

        self.bus.publish_all(&events).await;
        Ok(())
    }

    /// Mark a confirmed registration as paid.
    ///
    /// The payment window opens at game start on an open or finished game.
    /// An early attempt publishes `PaymentAttemptRejectedEarly` (after
    /// commit - the one event emitted for a failed operation) and then
    /// fails. A repeated call on an already-paid registration is a success
    /// no-op: the timestamp stays and no second event is published.
    pub async fn mark_payment(&self, game_id: &str, player_id: &str) -> EngineResult<()> {
        let (outcome, events) = self.repo.transaction(|txn| {
            let game = txn
                .find_game(game_id)?
                .ok_or_else(|| EngineError::NotFound(game_id.to_string()))?;

            let now = now_millis();
            if game.ensure_payment_window(now).is_err() {
                return Ok::<_, EngineError>((
                    PayOutcome::RejectedEarly,
                    vec![GameEvent::payment_attempt_rejected_early(game_id, player_id)],
                ));
            }

            let mut registration = txn
                .get_registration(game_id, player_id)?
                .ok_or(RuleViolation::NotConfirmed)?;

            if registration.mark_paid(now)? {
                txn.upsert_registration(&registration)?;
                Ok((
                    PayOutcome::Marked,
                    vec![GameEvent::payment_marked(game_id, player_id)],
                ))
            } else {
                Ok((PayOutcome::AlreadyPaid, Vec::new()))
            }
        })?;

        self.bus.publish_all(&events).await;
        match outcome {
            PayOutcome::Marked | PayOutcome::AlreadyPaid => Ok(()),
            PayOutcome::RejectedEarly => {
                tracing::debug!(game_id, player_id, "payment attempt before window");
                Err(RuleViolation::PaymentWindowNotOpen.into())
            }
        }
    }

    /// Close registrations for a game. No registration side effects.
    pub async fn close(&self, game_id: &str) -> EngineResult<Game> {
        let (game, events) = self.repo.transaction(|txn| {
            let mut game = txn
                .find_game(game_id)?
                .ok_or_else(|| EngineError::NotFound(game_id.to_string()))?;
            game.close()?;
            txn.update_game(&game)?;
            Ok::<_, EngineError>((game, vec![GameEvent::event_closed(game_id)]))
        })?;

        tracing::info!(game_id, "game closed");
        self.bus.publish_all(&events).await;
        Ok(game)
    }

    /// Cancel a game. Idempotent: canceling twice succeeds without a
    /// second event. Pending reminder jobs are not retracted - downstream
    /// subscribers check current game status when a reminder fires.
    pub async fn cancel(&self, game_id: &str) -> EngineResult<Game> {
        let (game, events) = self.repo.transaction(|txn| {
            let mut game = txn
                .find_game(game_id)?
                .ok_or_else(|| EngineError::NotFound(game_id.to_string()))?;
            let changed = game.cancel();
            if changed {
                txn.update_game(&game)?;
            }
            let events = if changed {
                vec![GameEvent::event_canceled(game_id)]
            } else {
                Vec::new()
            };
            Ok::<_, EngineError>((game, events))
        })?;

        tracing::info!(game_id, "game canceled");
        self.bus.publish_all(&events).await;
        Ok(game)
    }

    /// Finish a game (keeps the payment window open)
    pub async fn finish(&self, game_id: &str) -> EngineResult<Game> {
        let (game, events) = self.repo.transaction(|txn| {
            let mut game = txn
                .find_game(game_id)?
                .ok_or_else(|| EngineError::NotFound(game_id.to_string()))?;
            game.finish()?;
            txn.update_game(&game)?;
            Ok::<_, EngineError>((game, vec![GameEvent::event_finished(game_id)]))
        })?;

        tracing::info!(game_id, "game finished");
        self.bus.publish_all(&events).await;
        Ok(game)
    }

    // ========== Read Side ==========

    pub fn get_game(&self, game_id: &str) -> EngineResult<Game> {
        self.repo
            .find_game(game_id)?
            .ok_or_else(|| EngineError::NotFound(game_id.to_string()))
    }

    pub fn list_games(&self) -> EngineResult<Vec<Game>> {
        Ok(self.repo.list_games()?)
    }

    pub fn registrations(&self, game_id: &str) -> EngineResult<Vec<Registration>> {
        if self.repo.find_game(game_id)?.is_none() {
            return Err(EngineError::NotFound(game_id.to_string()));
        }
        Ok(self.repo.registrations_for_game(game_id)?)
    }
}
