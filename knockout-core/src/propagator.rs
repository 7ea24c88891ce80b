use crate::{Bracket, EntrantSpot, Error, Match, MatchState, Result};

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The result of reporting a winner with [`Bracket::report_result`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Outcome {
    /// `true` if the reported match was the final.
    pub completed: bool,
    /// The champion of the bracket, only set if `completed` is `true`.
    pub champion: Option<EntrantSpot>,
}

impl Outcome {
    #[inline]
    fn ongoing() -> Self {
        Self {
            completed: false,
            champion: None,
        }
    }

    #[inline]
    fn completed(champion: EntrantSpot) -> Self {
        Self {
            completed: true,
            champion: Some(champion),
        }
    }
}

impl Bracket {
    /// Reports `winner` as the winner of the match at `index` in round `round` and forwards the
    /// winner into the next round.
    ///
    /// Reporting the same winner for an already decided match again does nothing and returns the
    /// same [`Outcome`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MatchNotFound`] if no match exists at the given position,
    /// [`Error::InvalidWinner`] if `winner` does not occupy a spot in the match,
    /// [`Error::MatchPending`] if a spot of the match is still `TBD` and
    /// [`Error::AlreadyDecided`] if a different winner was already reported. The bracket is
    /// never modified when an error is returned.
    pub fn report_result(&mut self, round: usize, index: usize, winner: &str) -> Result<Outcome> {
        self.report_result_with_rng(round, index, winner, &mut rand::thread_rng())
    }

    /// Same as [`report_result`], but uses `rng` to generate the codes of matches that need to be
    /// allocated in the next round.
    ///
    /// [`report_result`]: Self::report_result
    pub fn report_result_with_rng<R>(
        &mut self,
        round: usize,
        index: usize,
        winner: &str,
        rng: &mut R,
    ) -> Result<Outcome>
    where
        R: Rng + ?Sized,
    {
        let num_rounds = self.rounds.len();

        let r#match = self
            .get_mut(round, index)
            .ok_or(Error::MatchNotFound { round, index })?;

        // `round` is in bounds here, so `num_rounds >= 1`.
        let is_final = round == num_rounds - 1;

        let winner = select_winner(r#match, winner)?;

        if let Some(current) = r#match.winner() {
            if *current != winner {
                return Err(Error::AlreadyDecided {
                    round,
                    index,
                    winner: current.to_string(),
                });
            }

            log::debug!("Match {}:{} already won by {}", round, index, winner);

            return Ok(if is_final {
                Outcome::completed(winner)
            } else {
                Outcome::ongoing()
            });
        }

        if r#match.state() == MatchState::Pending {
            return Err(Error::MatchPending { round, index });
        }

        log::debug!("Reporting {} as winner of match {}:{}", winner, round, index);

        r#match.set_winner(winner.clone());

        if is_final {
            log::debug!("Final decided, champion is {}", winner);
            return Ok(Outcome::completed(winner));
        }

        // `round + 1` exists, otherwise `is_final` would be true.
        let next_round = &mut self.rounds[round + 1];
        let next_index = index / 2;

        // Brackets may not have allocated all matches of the next round.
        while next_round.matches.len() <= next_index {
            log::debug!(
                "Allocating match {}:{}",
                round + 1,
                next_round.matches.len()
            );

            next_round.matches.push(Match::placeholder(rng));
        }

        let position = index % 2;
        if let Some(spot) = next_round.matches[next_index].get_mut(position) {
            log::debug!(
                "Forwarding {} into match {}:{} at position {}",
                winner,
                round + 1,
                next_index,
                position
            );

            *spot = winner;
        }

        Ok(Outcome::ongoing())
    }
}

/// Returns the spot of `r#match` that is occupied by `winner`.
fn select_winner(r#match: &Match, winner: &str) -> Result<EntrantSpot> {
    let spot = if *r#match.team1() == winner {
        r#match.team1()
    } else if *r#match.team2() == winner {
        r#match.team2()
    } else {
        return Err(Error::InvalidWinner {
            winner: winner.to_owned(),
        });
    };

    if spot.is_tbd() {
        return Err(Error::InvalidWinner {
            winner: winner.to_owned(),
        });
    }

    Ok(spot.clone())
}

#[cfg(test)]
mod tests {
    use crate::{Bracket, EntrantSpot, Error, Match, MatchCode, MatchState, Round};

    use super::Outcome;

    fn entrants(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Team {}", i)).collect()
    }

    fn m(team1: &str, team2: &str) -> Match {
        Match::new(
            EntrantSpot::new(team1),
            EntrantSpot::new(team2),
            MatchCode::from(String::from("10000")),
        )
    }

    /// Reports `team1` (or `team2` if `team1` is a bye) for every undecided match until the
    /// bracket is completed.
    fn play(bracket: &mut Bracket) -> Outcome {
        for round in 0..bracket.rounds().len() {
            for index in 0..bracket[round].len() {
                let r#match = &bracket[round][index];
                let winner = if r#match.team1().is_bye() {
                    r#match.team2().to_string()
                } else {
                    r#match.team1().to_string()
                };

                let outcome = bracket.report_result(round, index, &winner).unwrap();
                if outcome.completed {
                    return outcome;
                }
            }
        }

        panic!("bracket was not completed");
    }

    #[test]
    fn test_report_result_final() {
        let mut bracket = Bracket::build(["A", "B"], None);

        let winner = bracket[0][0].team2().to_string();
        let outcome = bracket.report_result(0, 0, &winner).unwrap();

        assert_eq!(
            outcome,
            Outcome {
                completed: true,
                champion: Some(EntrantSpot::new(winner.as_str())),
            }
        );
        assert_eq!(bracket.champion(), Some(&EntrantSpot::new(winner.as_str())));
        assert!(bracket.is_completed());
    }

    #[test]
    fn test_report_result_fills_one_slot() {
        let mut bracket = Bracket::build(entrants(8), Some(5));
        let before = bracket.clone();

        let winner = bracket[0][2].team1().to_string();
        let outcome = bracket.report_result(0, 2, &winner).unwrap();
        assert!(!outcome.completed);
        assert_eq!(outcome.champion, None);

        // Exactly one slot of one match in the next round changed.
        let mut changed = 0;
        for (a, b) in before[1].iter().zip(bracket[1].iter()) {
            if a.team1() != b.team1() {
                changed += 1;
            }
            if a.team2() != b.team2() {
                changed += 1;
            }
        }
        assert_eq!(changed, 1);
        assert_eq!(bracket[1][1].team1(), &EntrantSpot::new(winner.as_str()));

        // All other rounds are untouched.
        assert_eq!(before[2], bracket[2]);
        assert_eq!(bracket[0][2].winner(), Some(&EntrantSpot::new(winner.as_str())));
    }

    #[test]
    fn test_report_result_positions() {
        let mut bracket = Bracket::build(entrants(16), Some(9));

        for k in 0..8 {
            let winner = bracket[0][k].team2().to_string();
            bracket.report_result(0, k, &winner).unwrap();

            let next = &bracket[1][k / 2];
            if k % 2 == 0 {
                assert_eq!(next.team1(), &EntrantSpot::new(winner.as_str()));
            } else {
                assert_eq!(next.team2(), &EntrantSpot::new(winner.as_str()));
            }
        }

        for r#match in bracket[1].iter() {
            assert_eq!(r#match.state(), MatchState::Ready);
        }
    }

    #[test]
    fn test_report_result_five_entrants() {
        let mut bracket = Bracket::build(["A", "B", "C", "D", "E"], None);

        for index in 0..bracket[0].len() {
            let r#match = &bracket[0][index];
            let winner = if r#match.team1().is_entrant() {
                r#match.team1().to_string()
            } else {
                r#match.team2().to_string()
            };

            bracket.report_result(0, index, &winner).unwrap();
        }

        for index in 0..bracket[1].len() {
            let r#match = &bracket[1][index];
            let winner = if r#match.team1().is_entrant() {
                r#match.team1().to_string()
            } else {
                r#match.team2().to_string()
            };

            bracket.report_result(1, index, &winner).unwrap();
        }

        let r#final = bracket.final_match().unwrap();
        assert!(r#final.team1().is_entrant());
        assert!(r#final.team2().is_entrant());
        assert_eq!(r#final.state(), MatchState::Ready);
    }

    #[test]
    fn test_report_result_play_through() {
        for n in 2..=17 {
            let mut bracket = Bracket::build(entrants(n), None);
            let outcome = play(&mut bracket);

            assert!(outcome.completed);
            assert_eq!(bracket.champion(), outcome.champion.as_ref());
            assert!(bracket.matches().all(|(_, m)| m.state() == MatchState::Decided));
        }
    }

    #[test]
    fn test_report_result_not_found() {
        let mut bracket = Bracket::build(entrants(4), None);
        let before = bracket.clone();

        assert_eq!(
            bracket.report_result(0, 2, "Team 0"),
            Err(Error::MatchNotFound { round: 0, index: 2 })
        );
        assert_eq!(
            bracket.report_result(5, 0, "Team 0"),
            Err(Error::MatchNotFound { round: 5, index: 0 })
        );
        assert_eq!(
            bracket.report_result(usize::MAX, 0, "Team 0"),
            Err(Error::MatchNotFound {
                round: usize::MAX,
                index: 0
            })
        );
        assert_eq!(
            bracket.report_result(0, usize::MAX, "Team 0"),
            Err(Error::MatchNotFound {
                round: 0,
                index: usize::MAX
            })
        );
        assert_eq!(
            bracket.report_result(usize::MAX, usize::MAX, "Team 0"),
            Err(Error::MatchNotFound {
                round: usize::MAX,
                index: usize::MAX
            })
        );
        assert_eq!(bracket, before);
    }

    #[test]
    fn test_report_result_invalid_winner() {
        let mut bracket = Bracket::resume(vec![
            Round::from(vec![m("A", "B"), m("C", "BYE")]),
            Round::from(vec![m("TBD", "TBD")]),
        ])
        .unwrap();
        let before = bracket.clone();

        assert_eq!(
            bracket.report_result(0, 0, "C"),
            Err(Error::InvalidWinner {
                winner: String::from("C")
            })
        );
        assert_eq!(
            bracket.report_result(1, 0, "TBD"),
            Err(Error::InvalidWinner {
                winner: String::from("TBD")
            })
        );
        assert_eq!(bracket, before);
    }

    #[test]
    fn test_report_result_pending() {
        let mut bracket = Bracket::resume(vec![
            Round::from(vec![m("A", "B"), m("C", "D")]),
            Round::from(vec![m("A", "TBD")]),
        ])
        .unwrap();
        let before = bracket.clone();

        assert_eq!(
            bracket.report_result(1, 0, "A"),
            Err(Error::MatchPending { round: 1, index: 0 })
        );
        assert_eq!(bracket, before);
    }

    #[test]
    fn test_report_result_bye() {
        let mut bracket = Bracket::resume(vec![
            Round::from(vec![m("A", "B"), m("C", "BYE")]),
            Round::from(vec![m("TBD", "TBD")]),
        ])
        .unwrap();

        bracket.report_result(0, 1, "C").unwrap();
        assert_eq!(bracket[1][0].team2(), &EntrantSpot::new("C"));
        assert_eq!(bracket[1][0].team1(), &EntrantSpot::TBD);
    }

    #[test]
    fn test_report_result_again() {
        let mut bracket = Bracket::resume(vec![
            Round::from(vec![m("A", "B"), m("C", "D")]),
            Round::from(vec![m("TBD", "TBD")]),
        ])
        .unwrap();

        bracket.report_result(0, 0, "A").unwrap();
        let before = bracket.clone();

        // Same winner is a no-op.
        assert_eq!(bracket.report_result(0, 0, "A"), Ok(Outcome::ongoing()));
        assert_eq!(bracket, before);

        // A different winner is rejected.
        assert_eq!(
            bracket.report_result(0, 0, "B"),
            Err(Error::AlreadyDecided {
                round: 0,
                index: 0,
                winner: String::from("A"),
            })
        );
        assert_eq!(bracket, before);

        bracket.report_result(0, 1, "D").unwrap();
        bracket.report_result(1, 0, "D").unwrap();
        assert_eq!(
            bracket.report_result(1, 0, "D"),
            Ok(Outcome::completed(EntrantSpot::new("D")))
        );
    }

    #[test]
    fn test_report_result_allocates_next_match() {
        let mut bracket = Bracket::resume(vec![
            Round::from(vec![m("A", "B"), m("C", "D"), m("E", "F"), m("G", "H")]),
            Round::new(),
            Round::new(),
        ])
        .unwrap();

        bracket.report_result(0, 3, "H").unwrap();

        assert_eq!(bracket[1].len(), 2);
        assert!(bracket[1][0].team1().is_tbd());
        assert!(bracket[1][0].team2().is_tbd());
        assert_eq!(bracket[1][1].team2(), &EntrantSpot::new("H"));
        assert_eq!(bracket[1][1].code().as_str().len(), 5);

        bracket.report_result(0, 2, "E").unwrap();
        bracket.report_result(1, 1, "E").unwrap();

        assert_eq!(bracket[2].len(), 1);
        assert_eq!(bracket[2][0].team2(), &EntrantSpot::new("E"));
    }
}
