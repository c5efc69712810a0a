//! Repository abstraction over game storage
//!
//! The registration engine talks to a capability trait, not to redb
//! directly: `GameRepository` hands out a scoped unit of work
//! (`transaction`) whose closure runs against a `GameTxn`. Commit on `Ok`,
//! abort on `Err`. Cross-cutting logging is a wrapping decorator
//! (`LoggedRepository`) around any implementation, not a base type.

use redb::WriteTransaction;
use shared::{Game, Registration};
use std::time::Instant;

use super::storage::{GameStore, StorageError, StorageResult};

/// Operations available inside one unit of work
///
/// Everything here sees and produces state of the same write transaction;
/// nothing is visible to readers until the transaction commits.
pub trait GameTxn {
    fn find_game(&self, game_id: &str) -> StorageResult<Option<Game>>;
    fn insert_game(&mut self, game: &Game) -> StorageResult<()>;
    /// Overwrite a game record (status transitions)
    fn update_game(&mut self, game: &Game) -> StorageResult<()>;
    /// Number of confirmed registrations for the game
    fn count_confirmed(&self, game_id: &str) -> StorageResult<u32>;
    /// Increment the global join-sequence counter
    fn next_join_seq(&mut self) -> StorageResult<u64>;
    /// The active (non-canceled) registration for the pair, if any
    fn get_registration(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> StorageResult<Option<Registration>>;
    fn upsert_registration(&mut self, registration: &Registration) -> StorageResult<()>;
    /// Earliest-created still-waitlisted registration (FIFO head)
    fn first_waitlisted(&self, game_id: &str) -> StorageResult<Option<Registration>>;
    /// Promote the registration at `(game_id, joined_seq)` to confirmed.
    ///
    /// Re-checks the row is still waitlisted immediately before writing and
    /// reports `false` if it is not (or is gone) - the caller must not
    /// assume the head it fetched earlier is still promotable.
    fn promote_to_confirmed(&mut self, game_id: &str, joined_seq: u64) -> StorageResult<bool>;
}

/// Game repository capability
pub trait GameRepository: Send + Sync + 'static {
    type Txn<'a>: GameTxn
    where
        Self: 'a;

    /// Run `f` inside one atomic unit of work. Commits when `f` returns
    /// `Ok`, aborts (all writes discarded) when it returns `Err`.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut Self::Txn<'_>) -> Result<T, E>;

    // Read-only accessors (outside any unit of work)
    fn find_game(&self, game_id: &str) -> StorageResult<Option<Game>>;
    fn list_games(&self) -> StorageResult<Vec<Game>>;
    fn registrations_for_game(&self, game_id: &str) -> StorageResult<Vec<Registration>>;
}

/// redb-backed repository
#[derive(Clone)]
pub struct RedbRepository {
    store: GameStore,
}

impl RedbRepository {
    pub fn new(store: GameStore) -> Self {
        Self { store }
    }
}

/// One redb write transaction viewed through the `GameTxn` capability
pub struct RedbTxn<'a> {
    store: &'a GameStore,
    txn: &'a WriteTransaction,
}

impl GameTxn for RedbTxn<'_> {
    fn find_game(&self, game_id: &str) -> StorageResult<Option<Game>> {
        self.store.get_game_txn(self.txn, game_id)
    }

    fn insert_game(&mut self, game: &Game) -> StorageResult<()> {
        self.store.put_game_txn(self.txn, game)
    }

    fn update_game(&mut self, game: &Game) -> StorageResult<()> {
        self.store.put_game_txn(self.txn, game)
    }

    fn count_confirmed(&self, game_id: &str) -> StorageResult<u32> {
        self.store.count_confirmed_txn(self.txn, game_id)
    }

    fn next_join_seq(&mut self) -> StorageResult<u64> {
        self.store.next_join_seq_txn(self.txn)
    }

    fn get_registration(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> StorageResult<Option<Registration>> {
        self.store
            .get_active_registration_txn(self.txn, game_id, player_id)
    }

    fn upsert_registration(&mut self, registration: &Registration) -> StorageResult<()> {
        self.store.put_registration_txn(self.txn, registration)
    }

    fn first_waitlisted(&self, game_id: &str) -> StorageResult<Option<Registration>> {
        self.store.first_waitlisted_txn(self.txn, game_id)
    }

    fn promote_to_confirmed(&mut self, game_id: &str, joined_seq: u64) -> StorageResult<bool> {
        let Some(mut registration) = self.store.get_registration_txn(self.txn, game_id, joined_seq)?
        else {
            return Ok(false);
        };
        if !registration.promote() {
            return Ok(false);
        }
        self.store.put_registration_txn(self.txn, &registration)?;
        Ok(true)
    }
}

impl GameRepository for RedbRepository {
    type Txn<'a> = RedbTxn<'a>;

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut Self::Txn<'_>) -> Result<T, E>,
    {
        let txn = self.store.begin_write().map_err(E::from)?;
        let mut unit = RedbTxn {
            store: &self.store,
            txn: &txn,
        };
        match f(&mut unit) {
            Ok(value) => {
                txn.commit().map_err(|e| E::from(StorageError::from(e)))?;
                Ok(value)
            }
            // Dropping the transaction without commit aborts it
            Err(err) => Err(err),
        }
    }

    fn find_game(&self, game_id: &str) -> StorageResult<Option<Game>> {
        self.store.get_game(game_id)
    }

    fn list_games(&self) -> StorageResult<Vec<Game>> {
        self.store.get_all_games()
    }

    fn registrations_for_game(&self, game_id: &str) -> StorageResult<Vec<Registration>> {
        self.store.get_registrations_for_game(game_id)
    }
}

/// Logging decorator: times each unit of work and traces commit/abort
pub struct LoggedRepository<R> {
    inner: R,
}

impl<R> LoggedRepository<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: GameRepository> GameRepository for LoggedRepository<R> {
    type Txn<'a>
        = R::Txn<'a>
    where
        Self: 'a;

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut Self::Txn<'_>) -> Result<T, E>,
    {
        let started = Instant::now();
        let result = self.inner.transaction(f);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::debug!(elapsed_ms, "unit of work committed"),
            Err(_) => tracing::warn!(elapsed_ms, "unit of work aborted"),
        }
        result
    }

    fn find_game(&self, game_id: &str) -> StorageResult<Option<Game>> {
        self.inner.find_game(game_id)
    }

    fn list_games(&self) -> StorageResult<Vec<Game>> {
        self.inner.list_games()
    }

    fn registrations_for_game(&self, game_id: &str) -> StorageResult<Vec<Registration>> {
        self.inner.registrations_for_game(game_id)
    }
}
