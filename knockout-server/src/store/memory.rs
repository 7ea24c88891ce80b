use std::collections::HashMap;
use std::sync::Arc;

use knockout_core::{Tournament, TournamentId, TournamentOverview};
use parking_lot::RwLock;

use crate::Error;

/// A store keeping all tournaments in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    tournaments: Arc<RwLock<HashMap<TournamentId, Tournament>>>,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<TournamentOverview> {
        let tournaments = self.tournaments.read();

        let mut overviews: Vec<_> = tournaments.values().map(Tournament::overview).collect();
        overviews.sort_by_key(|t| t.id);
        overviews
    }

    pub fn get(&self, id: TournamentId) -> Option<Tournament> {
        self.tournaments.read().get(&id).cloned()
    }

    pub fn insert(&self, tournament: &Tournament) -> Result<(), Error> {
        let mut tournaments = self.tournaments.write();

        if tournaments.contains_key(&tournament.id) {
            return Err(Error::Conflict);
        }

        tournaments.insert(tournament.id, tournament.clone());
        Ok(())
    }

    pub fn save(&self, tournament: &mut Tournament) -> Result<(), Error> {
        let mut tournaments = self.tournaments.write();

        let stored = tournaments
            .get_mut(&tournament.id)
            .ok_or(Error::Conflict)?;

        if stored.version != tournament.version {
            log::debug!(
                "Rejecting save of tournament {}: version {} is outdated (stored {})",
                tournament.id,
                tournament.version,
                stored.version
            );

            return Err(Error::Conflict);
        }

        tournament.version += 1;
        *stored = tournament.clone();
        Ok(())
    }

    pub fn delete(&self, id: TournamentId) -> bool {
        self.tournaments.write().remove(&id).is_some()
    }
}
