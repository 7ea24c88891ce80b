//! The tournament record owning a [`Bracket`].
//!
//! A [`Tournament`] starts out [`Open`], accepting team registrations up to `max_teams`. Once
//! started the bracket is generated from the registered teams and no more teams can join. The
//! tournament is [`Completed`] as soon as the final is decided.
//!
//! [`Open`]: TournamentStatus::Open
//! [`Completed`]: TournamentStatus::Completed
use chrono::{DateTime, NaiveDate, Utc};

use crate::{Bracket, Caller, EntrantSpot, Error, Outcome, Result, TournamentId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The minimum number of teams required to start a tournament.
pub const MIN_TEAMS: usize = 2;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TournamentStatus {
    #[default]
    Open,
    Started,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub max_teams: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub start_date: Option<NaiveDate>,
    pub created: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(default))]
    status: TournamentStatus,
    #[cfg_attr(feature = "serde", serde(default))]
    teams: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    bracket: Option<Bracket>,
    #[cfg_attr(feature = "serde", serde(default))]
    winner: Option<String>,
    /// The version of the record in storage. Every successful write increments the version.
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: u64,
}

impl Tournament {
    /// Creates a new open `Tournament` without any teams.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if `name` is blank and [`Error::InvalidMaxTeams`] if
    /// `max_teams` is smaller than 2.
    pub fn new<T>(
        id: TournamentId,
        name: T,
        max_teams: usize,
        start_date: Option<NaiveDate>,
    ) -> Result<Self>
    where
        T: AsRef<str>,
    {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(Error::InvalidName);
        }

        if max_teams < MIN_TEAMS {
            return Err(Error::InvalidMaxTeams {
                max_teams,
                min: MIN_TEAMS,
            });
        }

        Ok(Self {
            id,
            name: name.to_owned(),
            max_teams,
            start_date,
            created: Utc::now(),
            status: TournamentStatus::Open,
            teams: Vec::new(),
            bracket: None,
            winner: None,
            version: 0,
        })
    }

    #[inline]
    pub fn status(&self) -> TournamentStatus {
        self.status
    }

    /// Returns the registered teams in registration order.
    #[inline]
    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    /// Returns the bracket, or `None` if the tournament was not started yet.
    #[inline]
    pub fn bracket(&self) -> Option<&Bracket> {
        self.bracket.as_ref()
    }

    /// Returns the champion of a completed tournament.
    #[inline]
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    /// Registers a new team.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if the tournament has already started or is full, the team is
    /// already registered or `team` is a reserved name.
    pub fn register<T>(&mut self, team: T) -> Result<()>
    where
        T: AsRef<str>,
    {
        if self.status != TournamentStatus::Open {
            return Err(Error::AlreadyStarted);
        }

        let team = team.as_ref().trim();
        if !EntrantSpot::new(team).is_entrant() {
            return Err(Error::ReservedName(team.to_owned()));
        }

        if self.teams.len() >= self.max_teams {
            return Err(Error::TournamentFull {
                max_teams: self.max_teams,
            });
        }

        if self.teams.iter().any(|t| t == team) {
            return Err(Error::AlreadyRegistered(team.to_owned()));
        }

        log::debug!("Registering team {:?} in tournament {}", team, self.id);

        self.teams.push(team.to_owned());
        Ok(())
    }

    /// Removes a registered team.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] if the tournament has already started or the team is not
    /// registered.
    pub fn remove(&mut self, team: &str) -> Result<()> {
        if self.status != TournamentStatus::Open {
            return Err(Error::AlreadyStarted);
        }

        let index = self
            .teams
            .iter()
            .position(|t| t == team)
            .ok_or_else(|| Error::TeamNotFound(team.to_owned()))?;

        self.teams.remove(index);
        Ok(())
    }

    /// Applies a [`TournamentPatch`]. Either all fields of the patch are applied or none.
    ///
    /// A blank name is ignored. The maximum number of teams and the start date can only be changed
    /// while the tournament is open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] when changing `max_teams` or `start_date` of a started
    /// tournament and [`Error::InvalidMaxTeams`] if `max_teams` is smaller than 2 or smaller than
    /// the number of registered teams.
    pub fn update(&mut self, patch: TournamentPatch) -> Result<()> {
        if self.status != TournamentStatus::Open
            && (patch.max_teams.is_some() || patch.start_date.is_some())
        {
            return Err(Error::AlreadyStarted);
        }

        if let Some(max_teams) = patch.max_teams {
            let min = MIN_TEAMS.max(self.teams.len());
            if max_teams < min {
                return Err(Error::InvalidMaxTeams { max_teams, min });
            }
        }

        if let Some(name) = patch.name {
            let name = name.trim();
            if !name.is_empty() {
                self.name = name.to_owned();
            }
        }

        if let Some(max_teams) = patch.max_teams {
            self.max_teams = max_teams;
        }

        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }

        Ok(())
    }

    /// Starts the tournament, generating the bracket from all registered teams.
    ///
    /// See [`Bracket::build`] for how `seed` is used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] if the tournament is not open and
    /// [`Error::InvalidEntrantCount`] if less than 2 teams are registered.
    pub fn start(&mut self, seed: Option<u64>) -> Result<&Bracket> {
        if self.status != TournamentStatus::Open {
            return Err(Error::AlreadyStarted);
        }

        if self.teams.len() < MIN_TEAMS {
            return Err(Error::InvalidEntrantCount {
                found: self.teams.len(),
            });
        }

        log::debug!(
            "Starting tournament {} with {} teams",
            self.id,
            self.teams.len()
        );

        self.status = TournamentStatus::Started;
        Ok(self
            .bracket
            .insert(Bracket::build(self.teams.iter().cloned(), seed)))
    }

    /// Reports the winner of a match. See [`Bracket::report_result`].
    ///
    /// The tournament becomes [`Completed`] once the final is reported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotStarted`] if the tournament has no bracket yet. All errors from
    /// [`Bracket::report_result`] are forwarded.
    ///
    /// [`Completed`]: TournamentStatus::Completed
    pub fn report_result(&mut self, round: usize, index: usize, winner: &str) -> Result<Outcome> {
        if self.status == TournamentStatus::Open {
            return Err(Error::NotStarted);
        }

        let bracket = self.bracket.as_mut().ok_or(Error::NotStarted)?;

        let outcome = bracket.report_result(round, index, winner)?;

        if let Some(champion) = &outcome.champion {
            log::debug!("Tournament {} won by {}", self.id, champion);

            self.status = TournamentStatus::Completed;
            self.winner = Some(champion.to_string());
        }

        Ok(outcome)
    }

    /// Returns a copy of the tournament with all match codes `caller` may not see hidden.
    pub fn redacted(&self, caller: &Caller) -> Self {
        let mut this = self.clone();
        this.bracket = self.bracket.as_ref().map(|b| b.redacted(caller));
        this
    }

    pub fn overview(&self) -> TournamentOverview {
        TournamentOverview {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            teams: self.teams.len(),
            max_teams: self.max_teams,
            start_date: self.start_date,
            winner: self.winner.clone(),
        }
    }
}

/// A partial update of a [`Tournament`]. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TournamentPatch {
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_teams: Option<usize>,
    /// `Some(None)` clears the start date.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "crate::serde_impl::deserialize_some")
    )]
    pub start_date: Option<Option<NaiveDate>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TournamentOverview {
    pub id: TournamentId,
    pub name: String,
    pub status: TournamentStatus,
    pub teams: usize,
    pub max_teams: usize,
    pub start_date: Option<NaiveDate>,
    pub winner: Option<String>,
}
