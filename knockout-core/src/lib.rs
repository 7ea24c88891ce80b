//! # knockout-core
//!
//! This crate contains everything required to build and play a single elimination bracket.
//!
//! Important types:
//! - [`Bracket`]: An ordered list of [`Round`]s, the last one always containing the final.
//! - [`BracketBuilder`]: Seeds a new [`Bracket`] from a list of entrant names, padding it with
//! byes up to the next power of two.
//! - [`Match`]: A *match* between two [`EntrantSpot`]s, with an optional winner and a
//! [`MatchCode`].
//! - [`EntrantSpot`]: A *spot* within a match, which can contain an entrant, a bye or a
//! to-be-done spot.
//! - [`Tournament`]: The tournament record owning the bracket and driving its status.
//! - [`Caller`]: The authorization context used to decide whether a match code is visible.
//!
//! Results are reported using [`Bracket::report_result`] (or [`Tournament::report_result`])
//! which forwards the winner into the next round.
//!
//! ## Feature Flags
//!
//! `serde`: Adds `Serialize` and `Deserialize` impls to almost all types. Entrant spots are
//! encoded as plain strings (`"BYE"`, `"TBD"` or the entrant name).
//!
mod bracket;
mod builder;
mod id;
mod propagator;
pub mod tournament;
mod utils;
mod visibility;

#[cfg(feature = "serde")]
mod serde_impl;

pub use bracket::{Bracket, Round};
pub use builder::BracketBuilder;
pub use id::TournamentId;
pub use propagator::Outcome;
pub use tournament::{Tournament, TournamentOverview, TournamentPatch, TournamentStatus};
pub use visibility::{Caller, Role, HIDDEN_CODE};

use rand::Rng;
use thiserror::Error;

use std::fmt::{self, Display, Formatter};
use std::result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The literal used for a permanently empty spot.
pub const BYE: &str = "BYE";
/// The literal used for a spot whose entrant is not known yet.
pub const TBD: &str = "TBD";

/// An `Result<T>` using [`enum@Error`] as an error type.
pub type Result<T> = result::Result<T, Error>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid number of entrants: at least 2 are required, found {found}")]
    InvalidEntrantCount { found: usize },
    #[error("no match at round {round}, index {index}")]
    MatchNotFound { round: usize, index: usize },
    #[error("invalid winner {winner:?}: not an entrant of the match")]
    InvalidWinner { winner: String },
    #[error("match at round {round}, index {index} is still waiting for an entrant")]
    MatchPending { round: usize, index: usize },
    #[error("match at round {round}, index {index} was already won by {winner:?}")]
    AlreadyDecided {
        round: usize,
        index: usize,
        winner: String,
    },
    #[error("the tournament has not been started")]
    NotStarted,
    #[error("the tournament has already been started")]
    AlreadyStarted,
    #[error("the tournament is full: {max_teams} teams allowed")]
    TournamentFull { max_teams: usize },
    #[error("team {0:?} is already registered")]
    AlreadyRegistered(String),
    #[error("team {0:?} is not registered")]
    TeamNotFound(String),
    #[error("{0:?} is a reserved name")]
    ReservedName(String),
    #[error("the tournament name must not be empty")]
    InvalidName,
    #[error("invalid maximum number of teams {max_teams}: must be at least {min}")]
    InvalidMaxTeams { max_teams: usize, min: usize },
    #[error("bracket has no matches")]
    EmptyBracket,
    #[error("invalid number of rounds: expected {expected}, found {found}")]
    InvalidNumberOfRounds { expected: usize, found: usize },
    #[error("invalid number of matches in round {round}: expected at most {expected}, found {found}")]
    InvalidNumberOfMatches {
        round: usize,
        expected: usize,
        found: usize,
    },
}

/// A spot for an entrant in a [`Match`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntrantSpot {
    Entrant(String),
    /// A permanently empty spot. The opponent advances once the match is reported.
    Bye,
    /// The entrant is decided by an earlier match that has no winner yet.
    TBD,
}

impl EntrantSpot {
    /// Creates a new `EntrantSpot` from a name. The reserved names [`BYE`] and [`TBD`] map to
    /// their placeholder variants, an empty name is treated as [`TBD`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use knockout_core::EntrantSpot;
    /// assert_eq!(EntrantSpot::new("BYE"), EntrantSpot::Bye);
    /// assert_eq!(EntrantSpot::new(""), EntrantSpot::TBD);
    /// assert!(EntrantSpot::new("Team A").is_entrant());
    /// ```
    pub fn new<T>(name: T) -> Self
    where
        T: Into<String>,
    {
        let name = name.into();

        match name.as_str() {
            BYE => Self::Bye,
            TBD | "" => Self::TBD,
            _ => Self::Entrant(name),
        }
    }

    /// Returns `true` if the `EntrantSpot` is [`Entrant`].
    ///
    /// [`Entrant`]: Self::Entrant
    pub fn is_entrant(&self) -> bool {
        matches!(self, Self::Entrant(_))
    }

    /// Returns `true` if the `EntrantSpot` is [`Bye`].
    ///
    /// [`Bye`]: Self::Bye
    pub fn is_bye(&self) -> bool {
        matches!(self, Self::Bye)
    }

    /// Returns `true` if the `EntrantSpot` is [`TBD`].
    ///
    /// [`TBD`]: Self::TBD
    pub fn is_tbd(&self) -> bool {
        matches!(self, Self::TBD)
    }

    /// Returns `true` if the occupant of the spot is known, i.e. it is an entrant or a bye.
    #[inline]
    pub fn is_concrete(&self) -> bool {
        !self.is_tbd()
    }

    /// Takes out the value, leaving [`Self::TBD`] in its place.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::TBD)
    }

    /// Returns the string representation of the spot.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Entrant(name) => name,
            Self::Bye => BYE,
            Self::TBD => TBD,
        }
    }

    /// Returns the name of the entrant, or `None` if the spot is a placeholder.
    pub fn entrant(&self) -> Option<&str> {
        match self {
            Self::Entrant(name) => Some(name),
            _ => None,
        }
    }
}

impl Default for EntrantSpot {
    #[inline]
    fn default() -> Self {
        Self::TBD
    }
}

impl Display for EntrantSpot {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for EntrantSpot {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<'a> PartialEq<&'a str> for EntrantSpot {
    #[inline]
    fn eq(&self, other: &&'a str) -> bool {
        self.as_str() == *other
    }
}

impl From<&str> for EntrantSpot {
    #[inline]
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EntrantSpot {
    #[inline]
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A 5 digit numeric code that is generated once for every [`Match`].
///
/// The code is only shown to admins and the entrants playing in the match, see
/// [`Match::visible_code`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MatchCode(String);

impl MatchCode {
    /// Generates a new random code in the range `10000..=99999` using `rng`.
    pub fn generate<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self(rng.gen_range(10000..=99999_u32).to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MatchCode {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MatchCode {
    #[inline]
    fn from(code: String) -> Self {
        Self(code)
    }
}

/// The state of a single [`Match`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MatchState {
    /// At least one spot is still [`EntrantSpot::TBD`].
    Pending,
    /// Both spots are known, but no winner was reported yet. Matches against a bye are `Ready`
    /// immediately.
    Ready,
    /// A winner was reported.
    Decided,
}

/// A match between two [`EntrantSpot`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Match {
    team1: EntrantSpot,
    team2: EntrantSpot,
    #[cfg_attr(feature = "serde", serde(default))]
    winner: Option<EntrantSpot>,
    code: MatchCode,
}

impl Match {
    /// Creates a new undecided `Match`.
    #[inline]
    pub fn new(team1: EntrantSpot, team2: EntrantSpot, code: MatchCode) -> Self {
        Self {
            team1,
            team2,
            winner: None,
            code,
        }
    }

    /// Creates a new `Match` with two [`EntrantSpot::TBD`] spots and a fresh code.
    pub fn placeholder<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::new(EntrantSpot::TBD, EntrantSpot::TBD, MatchCode::generate(rng))
    }

    #[inline]
    pub fn team1(&self) -> &EntrantSpot {
        &self.team1
    }

    #[inline]
    pub fn team2(&self) -> &EntrantSpot {
        &self.team2
    }

    /// Returns the spot at `position`. `0` is `team1`, `1` is `team2`.
    #[inline]
    pub fn get(&self, position: usize) -> Option<&EntrantSpot> {
        match position {
            0 => Some(&self.team1),
            1 => Some(&self.team2),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, position: usize) -> Option<&mut EntrantSpot> {
        match position {
            0 => Some(&mut self.team1),
            1 => Some(&mut self.team2),
            _ => None,
        }
    }

    #[inline]
    pub fn winner(&self) -> Option<&EntrantSpot> {
        self.winner.as_ref()
    }

    #[inline]
    pub(crate) fn set_winner(&mut self, winner: EntrantSpot) {
        self.winner = Some(winner);
    }

    #[inline]
    pub fn code(&self) -> &MatchCode {
        &self.code
    }

    #[inline]
    pub(crate) fn code_mut(&mut self) -> &mut MatchCode {
        &mut self.code
    }

    /// Returns `true` if `name` occupies one of the two spots.
    pub fn contains(&self, name: &str) -> bool {
        self.team1 == name || self.team2 == name
    }

    pub fn state(&self) -> MatchState {
        if self.winner.is_some() {
            MatchState::Decided
        } else if self.team1.is_concrete() && self.team2.is_concrete() {
            MatchState::Ready
        } else {
            MatchState::Pending
        }
    }
}
