//! redb-based storage for games and registrations
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `games` | `game_id` | `Game` | Game records |
//! | `registrations` | `(game_id, joined_seq)` | `Registration` | Registration rows (append-only) |
//! | `counters` | `&str` | `u64` | Global join-sequence counter |
//!
//! Registrations are keyed by creation order, never by player: a canceled
//! row must survive the player rejoining (audit trail), and `joined_seq` is
//! the FIFO key for waitlist promotion.
//!
//! # Serialization
//!
//! redb's single-writer write transactions are the per-game serialization
//! point: the confirmed-count read and the registration write land in the
//! same transaction, so concurrent joins cannot overrun capacity.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::{Game, Registration, RegistrationStatus};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for games: key = game_id, value = JSON-serialized Game
const GAMES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("games");

/// Table for registrations: key = (game_id, joined_seq), value = JSON-serialized Registration
const REGISTRATIONS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("registrations");

/// Table for counters: key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const JOIN_SEQ_KEY: &str = "join_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Game storage backed by redb
#[derive(Clone)]
pub struct GameStore {
    db: Arc<Database>,
}

impl GameStore {
    /// Open or create the database at the given path
    ///
    /// redb commits are persistent as soon as `commit()` returns
    /// (copy-on-write with atomic pointer swap), so a registration that was
    /// acknowledged survives a crash.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(GAMES_TABLE)?;
            let _ = write_txn.open_table(REGISTRATIONS_TABLE)?;

            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(JOIN_SEQ_KEY)?.is_none() {
                counters.insert(JOIN_SEQ_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Game Operations ==========

    /// Store or overwrite a game (within transaction)
    pub fn put_game_txn(&self, txn: &WriteTransaction, game: &Game) -> StorageResult<()> {
        let mut table = txn.open_table(GAMES_TABLE)?;
        let value = serde_json::to_vec(game)?;
        table.insert(game.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a game by ID (within transaction)
    pub fn get_game_txn(
        &self,
        txn: &WriteTransaction,
        game_id: &str,
    ) -> StorageResult<Option<Game>> {
        let table = txn.open_table(GAMES_TABLE)?;
        match table.get(game_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a game by ID (read-only, outside transaction)
    pub fn get_game(&self, game_id: &str) -> StorageResult<Option<Game>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GAMES_TABLE)?;
        match table.get(game_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get all games (read-only)
    pub fn get_all_games(&self) -> StorageResult<Vec<Game>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GAMES_TABLE)?;

        let mut games = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let game: Game = serde_json::from_slice(value.value())?;
            games.push(game);
        }
        Ok(games)
    }

    // ========== Join Sequence ==========

    /// Increment and return the global join sequence (within transaction)
    pub fn next_join_seq_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table
            .get(JOIN_SEQ_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0);
        let next = current + 1;
        table.insert(JOIN_SEQ_KEY, next)?;
        Ok(next)
    }

    // ========== Registration Operations ==========

    /// Store or overwrite a registration row (within transaction)
    pub fn put_registration_txn(
        &self,
        txn: &WriteTransaction,
        registration: &Registration,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(REGISTRATIONS_TABLE)?;
        let key = (registration.game_id.as_str(), registration.joined_seq);
        let value = serde_json::to_vec(registration)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get a registration row by key (within transaction)
    pub fn get_registration_txn(
        &self,
        txn: &WriteTransaction,
        game_id: &str,
        joined_seq: u64,
    ) -> StorageResult<Option<Registration>> {
        let table = txn.open_table(REGISTRATIONS_TABLE)?;
        match table.get((game_id, joined_seq))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get the active (non-canceled) registration for a (game, player) pair
    /// (within transaction)
    ///
    /// At most one active row per pair exists; canceled rows are skipped.
    pub fn get_active_registration_txn(
        &self,
        txn: &WriteTransaction,
        game_id: &str,
        player_id: &str,
    ) -> StorageResult<Option<Registration>> {
        let table = txn.open_table(REGISTRATIONS_TABLE)?;
        for result in table.range((game_id, 0u64)..=(game_id, u64::MAX))? {
            let (_key, value) = result?;
            let registration: Registration = serde_json::from_slice(value.value())?;
            if registration.player_id == player_id && registration.is_active() {
                return Ok(Some(registration));
            }
        }
        Ok(None)
    }

    /// Count confirmed registrations for a game (within transaction)
    pub fn count_confirmed_txn(&self, txn: &WriteTransaction, game_id: &str) -> StorageResult<u32> {
        let table = txn.open_table(REGISTRATIONS_TABLE)?;
        let mut count = 0u32;
        for result in table.range((game_id, 0u64)..=(game_id, u64::MAX))? {
            let (_key, value) = result?;
            let registration: Registration = serde_json::from_slice(value.value())?;
            if registration.status == RegistrationStatus::Confirmed {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Get the earliest-created still-waitlisted registration for a game
    /// (within transaction)
    ///
    /// Keys are `(game_id, joined_seq)` and redb ranges iterate in key
    /// order, so the first waitlisted hit is the FIFO head.
    pub fn first_waitlisted_txn(
        &self,
        txn: &WriteTransaction,
        game_id: &str,
    ) -> StorageResult<Option<Registration>> {
        let table = txn.open_table(REGISTRATIONS_TABLE)?;
        for result in table.range((game_id, 0u64)..=(game_id, u64::MAX))? {
            let (_key, value) = result?;
            let registration: Registration = serde_json::from_slice(value.value())?;
            if registration.status == RegistrationStatus::Waitlisted {
                return Ok(Some(registration));
            }
        }
        Ok(None)
    }

    /// Get all registrations for a game, in creation order (read-only)
    pub fn get_registrations_for_game(&self, game_id: &str) -> StorageResult<Vec<Registration>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REGISTRATIONS_TABLE)?;

        let mut registrations = Vec::new();
        for result in table.range((game_id, 0u64)..=(game_id, u64::MAX))? {
            let (_key, value) = result?;
            let registration: Registration = serde_json::from_slice(value.value())?;
            registrations.push(registration);
        }
        Ok(registrations)
    }
}
