//! Persistence layer: redb storage and the repository abstraction

pub mod repository;
pub mod storage;

pub use repository::{GameRepository, GameTxn, LoggedRepository, RedbRepository};
pub use storage::{GameStore, StorageError, StorageResult};
