//! Persistence of [`Tournament`] records.
//!
//! Every record carries a `version`. [`Store::save`] only writes a record if the stored version
//! still equals the version the record was loaded with, otherwise [`Error::Conflict`] is
//! returned. This prevents two concurrent requests from overwriting each other's bracket.
pub mod id;

mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use knockout_core::{Tournament, TournamentId, TournamentOverview};

use crate::config::Database;
use crate::Error;

#[derive(Clone, Debug)]
pub enum Store {
    Memory(MemoryStore),
    MySql(MySqlStore),
}

impl Store {
    #[inline]
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Creates a new MySQL backed store. Connections are established lazily.
    pub fn mysql(config: &Database) -> Result<Self, Error> {
        Ok(Self::MySql(MySqlStore::new(config)?))
    }

    /// Creates all required tables if they don't exist yet.
    pub async fn migrate(&self) -> Result<(), Error> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::MySql(store) => store.migrate().await,
        }
    }

    pub async fn list(&self) -> Result<Vec<TournamentOverview>, Error> {
        match self {
            Self::Memory(store) => Ok(store.list()),
            Self::MySql(store) => store.list().await,
        }
    }

    pub async fn get(&self, id: TournamentId) -> Result<Option<Tournament>, Error> {
        match self {
            Self::Memory(store) => Ok(store.get(id)),
            Self::MySql(store) => store.get(id).await,
        }
    }

    /// Inserts a new tournament.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if a tournament with the same id already exists.
    pub async fn insert(&self, tournament: &Tournament) -> Result<(), Error> {
        match self {
            Self::Memory(store) => store.insert(tournament),
            Self::MySql(store) => store.insert(tournament).await,
        }
    }

    /// Saves an existing tournament, incrementing its `version` on success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the tournament was modified or deleted since it was loaded.
    pub async fn save(&self, tournament: &mut Tournament) -> Result<(), Error> {
        match self {
            Self::Memory(store) => store.save(tournament),
            Self::MySql(store) => store.save(tournament).await,
        }
    }

    /// Deletes a tournament. Returns `false` if the tournament did not exist.
    pub async fn delete(&self, id: TournamentId) -> Result<bool, Error> {
        match self {
            Self::Memory(store) => Ok(store.delete(id)),
            Self::MySql(store) => store.delete(id).await,
        }
    }
}
