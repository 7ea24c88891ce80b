use crate::utils::NumExt;
use crate::{BracketBuilder, EntrantSpot, Error, Match, Result};

use std::ops::{Deref, Index};
use std::vec::IntoIter;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A wrapper around a `Vec<Match>` containing all matches played in a single round.
///
/// This is a wrapper around a `Vec<Match>` and has the same layout as a `Vec<Match>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Round {
    pub(crate) matches: Vec<Match>,
}

impl Round {
    #[inline]
    pub fn new() -> Self {
        Self {
            matches: Vec::new(),
        }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            matches: Vec::with_capacity(capacity),
        }
    }
}

impl Deref for Round {
    type Target = Vec<Match>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.matches
    }
}

impl From<Vec<Match>> for Round {
    #[inline]
    fn from(matches: Vec<Match>) -> Self {
        Self { matches }
    }
}

impl FromIterator<Match> for Round {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Match>,
    {
        Self {
            matches: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Round {
    type Item = Match;
    type IntoIter = IntoIter<Match>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

/// A single elimination bracket.
///
/// The rounds are ordered from the first round played to the final. Round `r + 1` has
/// `ceil(len(r) / 2)` matches and the final round has exactly one match. The winner of match `k`
/// in round `r` moves into match `k / 2` of round `r + 1`: into `team1` if `k` is even, into
/// `team2` if `k` is odd.
///
/// A `Bracket` is created using [`Bracket::build`] (or a [`BracketBuilder`]) and mutated only
/// by [`Bracket::report_result`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bracket {
    pub(crate) rounds: Vec<Round>,
}

impl Bracket {
    /// Builds a new `Bracket` from the given `entrants`.
    ///
    /// When a `seed` is given the bracket (including all match codes) is fully determined by the
    /// `(entrants, seed)` pair. Without a seed the entrants are shuffled randomly.
    ///
    /// The caller is responsible to supply at least 2 entrants, see [`BracketBuilder::build`].
    pub fn build<I, T>(entrants: I, seed: Option<u64>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        match seed {
            Some(seed) => BracketBuilder::seeded(seed).build(entrants),
            None => BracketBuilder::new().build(entrants),
        }
    }

    /// Resumes the bracket from existing rounds, i.e. a bracket loaded from storage.
    ///
    /// Later rounds may contain fewer matches than expected; missing matches are allocated when
    /// a winner is forwarded into them.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if the rounds have an invalid shape or a match contains a winner
    /// that is not one of its entrants.
    pub fn resume(rounds: Vec<Round>) -> Result<Self> {
        log::debug!("Trying to resume bracket with {} rounds", rounds.len());

        let first = match rounds.first() {
            Some(round) if !round.is_empty() => round.len(),
            _ => return Err(Error::EmptyBracket),
        };

        // A first round of `n` matches is followed by `ceil(log2(n))` more rounds.
        let expected = first.ilog2_ceil() + 1;
        if rounds.len() != expected {
            return Err(Error::InvalidNumberOfRounds {
                expected,
                found: rounds.len(),
            });
        }

        let mut max_matches = first;
        for (index, round) in rounds.iter().enumerate() {
            if round.len() > max_matches {
                return Err(Error::InvalidNumberOfMatches {
                    round: index,
                    expected: max_matches,
                    found: round.len(),
                });
            }

            for r#match in round.iter() {
                if let Some(winner) = r#match.winner() {
                    if winner.is_tbd() || !r#match.contains(winner.as_str()) {
                        return Err(Error::InvalidWinner {
                            winner: winner.to_string(),
                        });
                    }
                }
            }

            max_matches = (max_matches + 1) / 2;
        }

        Ok(Self { rounds })
    }

    /// Returns the rounds of the bracket.
    #[inline]
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Consumes the bracket, returning its rounds.
    #[inline]
    pub fn into_rounds(self) -> Vec<Round> {
        self.rounds
    }

    /// Returns the match at `index` in round `round`.
    #[inline]
    pub fn get(&self, round: usize, index: usize) -> Option<&Match> {
        self.rounds.get(round)?.get(index)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, round: usize, index: usize) -> Option<&mut Match> {
        self.rounds.get_mut(round)?.matches.get_mut(index)
    }

    /// Returns the final match, if it has already been allocated.
    pub fn final_match(&self) -> Option<&Match> {
        self.rounds.last()?.first()
    }

    /// Returns the champion of the bracket, or `None` if the final has not been decided.
    pub fn champion(&self) -> Option<&EntrantSpot> {
        self.final_match()?.winner()
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.champion().is_some()
    }

    /// Returns an iterator over all matches with their `(round, index)` address.
    pub fn matches(&self) -> impl Iterator<Item = ((usize, usize), &Match)> + '_ {
        self.rounds.iter().enumerate().flat_map(|(round, matches)| {
            matches
                .iter()
                .enumerate()
                .map(move |(index, r#match)| ((round, index), r#match))
        })
    }
}

impl Index<usize> for Bracket {
    type Output = Round;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.rounds[index]
    }
}

impl TryFrom<Vec<Round>> for Bracket {
    type Error = Error;

    #[inline]
    fn try_from(rounds: Vec<Round>) -> Result<Self> {
        Self::resume(rounds)
    }
}
