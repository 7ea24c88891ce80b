use crate::{Bracket, EntrantSpot, Match, MatchCode, Round};

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

/// Builds a new [`Bracket`] from an ordered list of entrant names.
///
/// The entrants are shuffled using the random source `R` (a Fisher-Yates shuffle), padded with
/// byes up to the next power of two and then paired up in order. All rounds following the first
/// round are allocated with [`EntrantSpot::TBD`] spots.
///
/// Matches between an entrant and a bye are **not** resolved automatically. They are
/// [`Ready`](crate::MatchState::Ready) and need to be reported like any other match.
#[derive(Clone, Debug)]
pub struct BracketBuilder<R> {
    rng: R,
}

impl BracketBuilder<ThreadRng> {
    /// Creates a new `BracketBuilder` using a non-reproducible random source.
    #[inline]
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for BracketBuilder<ThreadRng> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl BracketBuilder<StdRng> {
    /// Creates a new `BracketBuilder` which always produces the same [`Bracket`] for the same
    /// entrants and `seed`.
    #[inline]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R> BracketBuilder<R>
where
    R: Rng,
{
    #[inline]
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Builds the [`Bracket`].
    ///
    /// At least 2 entrants are required. [`Tournament::start`] checks this before building the
    /// bracket and returns [`Error::InvalidEntrantCount`] otherwise.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if less than 2 entrants are given.
    ///
    /// [`Tournament::start`]: crate::Tournament::start
    /// [`Error::InvalidEntrantCount`]: crate::Error::InvalidEntrantCount
    pub fn build<I, T>(mut self, entrants: I) -> Bracket
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut entrants: Vec<String> = entrants.into_iter().map(Into::into).collect();
        debug_assert!(
            entrants.len() >= crate::tournament::MIN_TEAMS,
            "a bracket requires at least 2 entrants, found {}",
            entrants.len()
        );

        log::debug!("Creating new bracket with {} entrants", entrants.len());

        shuffle(&mut entrants, &mut self.rng);

        let size = entrants.len().next_power_of_two();
        entrants.resize(size, String::from(crate::BYE));

        let mut first = Round::with_capacity(size / 2);
        for pair in entrants.chunks(2) {
            let (team1, team2) = normalize(
                pair.first().map(String::as_str),
                pair.get(1).map(String::as_str),
            );

            first
                .matches
                .push(Match::new(team1, team2, MatchCode::generate(&mut self.rng)));
        }

        let mut rounds = vec![first];

        // Allocate all remaining rounds until the final.
        let mut num_matches = rounds[0].len();
        while num_matches > 1 {
            num_matches = (num_matches + 1) / 2;

            let round = (0..num_matches)
                .map(|_| Match::placeholder(&mut self.rng))
                .collect();

            rounds.push(round);
        }

        log::debug!(
            "Created new bracket with {} rounds for {} spots",
            rounds.len(),
            size
        );

        Bracket { rounds }
    }
}

/// Shuffles `entrants` in place using the Fisher-Yates algorithm.
fn shuffle<T, R>(entrants: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    for i in (1..entrants.len()).rev() {
        let j = rng.gen_range(0..=i);
        entrants.swap(i, j);
    }
}

/// Converts a pair of raw spots into the spots of a match. A missing or empty `team1` becomes
/// `TBD`. A missing or empty `team2` becomes `TBD` if `team1` is a bye, otherwise it becomes a
/// bye.
fn normalize(team1: Option<&str>, team2: Option<&str>) -> (EntrantSpot, EntrantSpot) {
    let team1 = match team1 {
        Some(name) if !name.is_empty() => EntrantSpot::new(name),
        _ => EntrantSpot::TBD,
    };

    let team2 = match team2 {
        Some(name) if !name.is_empty() => EntrantSpot::new(name),
        _ if team1.is_bye() => EntrantSpot::TBD,
        _ => EntrantSpot::Bye,
    };

    (team1, team2)
}
