use knockout_core::TournamentId;
use snowflaked::sync::Generator;

const INSTANCE: u16 = 0;

static TOURNAMENT: Generator = Generator::new_unchecked(INSTANCE);

/// Returns a new unique [`TournamentId`].
pub fn tournament() -> TournamentId {
    TournamentId(TOURNAMENT.generate())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    #[test]
    fn test_tournament_id_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| super::tournament()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
