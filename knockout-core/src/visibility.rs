use crate::{Bracket, Match, MatchCode};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The placeholder shown instead of a [`MatchCode`] the caller is not allowed to see.
pub const HIDDEN_CODE: &str = "(hidden)";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// The authorization context of whoever is looking at or modifying a bracket.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Caller {
    pub role: Role,
    /// The name of the team the caller is a member of.
    pub team: Option<String>,
}

impl Caller {
    #[inline]
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            team: None,
        }
    }

    #[inline]
    pub fn member<T>(team: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            role: Role::User,
            team: Some(team.into()),
        }
    }

    /// A caller without any team or privileges.
    #[inline]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Match {
    /// Returns `true` if `caller` is allowed to see the code of this match. This is the case for
    /// admins and members of one of the two entrants.
    pub fn is_code_visible(&self, caller: &Caller) -> bool {
        if caller.is_admin() {
            return true;
        }

        match &caller.team {
            Some(team) => [self.team1(), self.team2()]
                .into_iter()
                .any(|spot| spot.entrant() == Some(team.as_str())),
            None => false,
        }
    }

    /// Returns the code of this match, or [`HIDDEN_CODE`] if `caller` may not see it.
    pub fn visible_code(&self, caller: &Caller) -> &str {
        if self.is_code_visible(caller) {
            self.code().as_str()
        } else {
            HIDDEN_CODE
        }
    }
}

impl Bracket {
    /// Returns a copy of the bracket with all codes `caller` may not see replaced by
    /// [`HIDDEN_CODE`].
    pub fn redacted(&self, caller: &Caller) -> Self {
        let mut bracket = self.clone();

        for round in bracket.rounds.iter_mut() {
            for r#match in round.matches.iter_mut() {
                if !r#match.is_code_visible(caller) {
                    *r#match.code_mut() = MatchCode::from(String::from(HIDDEN_CODE));
                }
            }
        }

        bracket
    }
}

#[cfg(test)]
mod tests {
    use crate::{Bracket, EntrantSpot, Match, MatchCode, Round};

    use super::{Caller, HIDDEN_CODE};

    fn m(team1: &str, team2: &str, code: &str) -> Match {
        Match::new(
            EntrantSpot::new(team1),
            EntrantSpot::new(team2),
            MatchCode::from(String::from(code)),
        )
    }

    #[test]
    fn test_visible_code() {
        let r#match = m("A", "B", "12345");

        assert_eq!(r#match.visible_code(&Caller::admin()), "12345");
        assert_eq!(r#match.visible_code(&Caller::member("A")), "12345");
        assert_eq!(r#match.visible_code(&Caller::member("B")), "12345");
        assert_eq!(r#match.visible_code(&Caller::member("C")), HIDDEN_CODE);
        assert_eq!(r#match.visible_code(&Caller::anonymous()), HIDDEN_CODE);

        // Nobody is a member of a placeholder.
        let r#match = m("A", "BYE", "12345");
        assert_eq!(r#match.visible_code(&Caller::member("BYE")), HIDDEN_CODE);
        let r#match = m("TBD", "TBD", "12345");
        assert_eq!(r#match.visible_code(&Caller::member("TBD")), HIDDEN_CODE);
    }

    #[test]
    fn test_bracket_redacted() {
        let bracket = Bracket::resume(vec![
            Round::from(vec![m("A", "B", "11111"), m("C", "D", "22222")]),
            Round::from(vec![m("TBD", "TBD", "33333")]),
        ])
        .unwrap();

        let redacted = bracket.redacted(&Caller::member("C"));
        assert_eq!(redacted[0][0].code().as_str(), HIDDEN_CODE);
        assert_eq!(redacted[0][1].code().as_str(), "22222");
        assert_eq!(redacted[1][0].code().as_str(), HIDDEN_CODE);

        let redacted = bracket.redacted(&Caller::admin());
        assert_eq!(redacted, bracket);
    }
}
