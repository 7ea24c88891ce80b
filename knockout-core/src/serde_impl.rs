use std::fmt::{self, Formatter};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Bracket, EntrantSpot, Round};

impl Serialize for EntrantSpot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EntrantSpot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntrantSpotVisitor;

        impl<'de> Visitor<'de> for EntrantSpotVisitor {
            type Value = EntrantSpot;

            fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
                formatter.write_str("an entrant name, \"BYE\", \"TBD\" or null")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EntrantSpot::new(v))
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EntrantSpot::new(v))
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EntrantSpot::TBD)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EntrantSpot::TBD)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_str(self)
            }
        }

        deserializer.deserialize_option(EntrantSpotVisitor)
    }
}

impl Serialize for Bracket {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.rounds.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Bracket {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let rounds = Vec::<Round>::deserialize(deserializer)?;

        Bracket::resume(rounds).map_err(de::Error::custom)
    }
}

/// Deserializes a present field into `Some`, even if its value is `null`. Together with
/// `#[serde(default)]` this distinguishes a missing field (`None`) from an explicit `null`
/// (`Some(None)`).
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_test::{assert_de_tokens, assert_tokens, Token};

    use crate::{Bracket, EntrantSpot, Match, MatchCode, Round, TournamentPatch};

    #[test]
    fn test_entrant_spot_serde() {
        assert_tokens(&EntrantSpot::new("Team A"), &[Token::Str("Team A")]);
        assert_tokens(&EntrantSpot::Bye, &[Token::Str("BYE")]);
        assert_tokens(&EntrantSpot::TBD, &[Token::Str("TBD")]);

        assert_de_tokens(&EntrantSpot::TBD, &[Token::None]);
        assert_de_tokens(&EntrantSpot::TBD, &[Token::Str("")]);
        assert_de_tokens(
            &EntrantSpot::new("Team A"),
            &[Token::Some, Token::Str("Team A")],
        );
    }

    #[test]
    fn test_match_json() {
        let mut r#match = Match::new(
            EntrantSpot::new("A"),
            EntrantSpot::Bye,
            MatchCode::from(String::from("12345")),
        );
        r#match.set_winner(EntrantSpot::new("A"));

        let json = serde_json::to_value(&r#match).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "team1": "A",
                "team2": "BYE",
                "winner": "A",
                "code": "12345",
            })
        );

        // `winner` may be missing or null.
        let r#match: Match = serde_json::from_str(
            r#"{"team1":"A","team2":null,"winner":null,"code":"54321"}"#,
        )
        .unwrap();
        assert_eq!(r#match.team2(), &EntrantSpot::TBD);
        assert_eq!(r#match.winner(), None);

        let r#match: Match =
            serde_json::from_str(r#"{"team1":"A","team2":"B","code":"54321"}"#).unwrap();
        assert_eq!(r#match.winner(), None);
    }

    #[test]
    fn test_bracket_json() {
        let bracket = Bracket::build(["A", "B", "C"], Some(5));

        let json = serde_json::to_string(&bracket).unwrap();
        let decoded: Bracket = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, bracket);

        let value = serde_json::to_value(&bracket).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_bracket_json_invalid() {
        // Two first round matches require a second round.
        let json = r#"[[
            {"team1":"A","team2":"B","code":"11111"},
            {"team1":"C","team2":"D","code":"22222"}
        ]]"#;
        assert!(serde_json::from_str::<Bracket>(json).is_err());

        // The winner is not an entrant of the match.
        let json = r#"[[{"team1":"A","team2":"B","winner":"C","code":"11111"}]]"#;
        assert!(serde_json::from_str::<Bracket>(json).is_err());

        let json = r#"[[]]"#;
        assert!(serde_json::from_str::<Bracket>(json).is_err());

        let rounds: Vec<Round> = serde_json::from_str(r#"[[]]"#).unwrap();
        assert_eq!(rounds, vec![Round::new()]);
    }

    #[test]
    fn test_tournament_patch_start_date() {
        let patch: TournamentPatch = serde_json::from_str(r#"{"name":"Cup"}"#).unwrap();
        assert_eq!(patch.name.as_deref(), Some("Cup"));
        assert_eq!(patch.start_date, None);

        let patch: TournamentPatch = serde_json::from_str(r#"{"start_date":null}"#).unwrap();
        assert_eq!(patch.start_date, Some(None));

        let patch: TournamentPatch =
            serde_json::from_str(r#"{"start_date":"2026-05-01"}"#).unwrap();
        assert_eq!(
            patch.start_date,
            Some(Some(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()))
        );
    }
}
