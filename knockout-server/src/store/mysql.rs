use std::time::Duration;

use futures::TryStreamExt;
use knockout_core::{Tournament, TournamentId, TournamentOverview};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::Row;

use crate::config::Database;
use crate::Error;

/// A store keeping all tournaments in a MySQL database.
///
/// Every tournament is stored in a single row as a JSON blob. The `version` column is the
/// authoritative version of the record.
#[derive(Clone, Debug)]
pub struct MySqlStore {
    pool: MySqlPool,
    table_prefix: String,
}

impl MySqlStore {
    pub fn new(config: &Database) -> Result<Self, Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(8)
            .max_lifetime(Duration::new(3600, 0))
            .idle_timeout(Duration::new(60, 0))
            .connect_lazy(&config.connect_string())?;

        Ok(Self {
            pool,
            table_prefix: config.prefix.clone(),
        })
    }

    pub async fn migrate(&self) -> Result<(), Error> {
        let sql = create_table(&self.table_prefix);

        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<TournamentOverview>, Error> {
        let sql = format!(
            "SELECT version, data FROM {}tournaments ORDER BY id ASC",
            self.table_prefix
        );

        let mut rows = sqlx::query(&sql).fetch(&self.pool);

        let mut tournaments = Vec::new();
        while let Some(row) = rows.try_next().await? {
            tournaments.push(decode(&row)?.overview());
        }

        Ok(tournaments)
    }

    pub async fn get(&self, id: TournamentId) -> Result<Option<Tournament>, Error> {
        let sql = format!(
            "SELECT version, data FROM {}tournaments WHERE id = ?",
            self.table_prefix
        );

        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(decode(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn insert(&self, tournament: &Tournament) -> Result<(), Error> {
        let sql = format!(
            "INSERT INTO {}tournaments (id, version, data) VALUES (?, ?, ?)",
            self.table_prefix
        );

        let res = sqlx::query(&sql)
            .bind(tournament.id.0)
            .bind(tournament.version)
            .bind(serde_json::to_vec(tournament)?)
            .execute(&self.pool)
            .await;

        match res {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if is_duplicate_key(err.code().as_deref()) => {
                Err(Error::Conflict)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn save(&self, tournament: &mut Tournament) -> Result<(), Error> {
        let sql = format!(
            "UPDATE {}tournaments SET version = ?, data = ? WHERE id = ? AND version = ?",
            self.table_prefix
        );

        let expected = tournament.version;
        tournament.version += 1;

        let data = match serde_json::to_vec(tournament) {
            Ok(data) => data,
            Err(err) => {
                tournament.version = expected;
                return Err(err.into());
            }
        };

        let res = sqlx::query(&sql)
            .bind(tournament.version)
            .bind(data)
            .bind(tournament.id.0)
            .bind(expected)
            .execute(&self.pool)
            .await;

        match res {
            Ok(res) if res.rows_affected() == 1 => Ok(()),
            Ok(_) => {
                tournament.version = expected;
                Err(Error::Conflict)
            }
            Err(err) => {
                tournament.version = expected;
                Err(err.into())
            }
        }
    }

    pub async fn delete(&self, id: TournamentId) -> Result<bool, Error> {
        let sql = format!("DELETE FROM {}tournaments WHERE id = ?", self.table_prefix);

        let res = sqlx::query(&sql).bind(id.0).execute(&self.pool).await?;

        Ok(res.rows_affected() > 0)
    }
}

/// The statement creating the tournaments table. A serialized tournament grows with its
/// bracket, so `data` is a `LONGBLOB` (a `BLOB` is capped at 64 KiB).
fn create_table(prefix: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {}tournaments (id BIGINT UNSIGNED PRIMARY KEY, version BIGINT UNSIGNED NOT NULL, data LONGBLOB NOT NULL)",
        prefix
    )
}

fn decode(row: &MySqlRow) -> Result<Tournament, Error> {
    let version: u64 = row.try_get("version")?;
    let data: &[u8] = row.try_get("data")?;

    let mut tournament: Tournament = serde_json::from_slice(data)?;
    tournament.version = version;

    Ok(tournament)
}

/// Returns `true` if the SQLSTATE `code` is an integrity constraint violation.
fn is_duplicate_key(code: Option<&str>) -> bool {
    code == Some("23000")
}

#[cfg(test)]
mod tests {
    use knockout_core::{Tournament, TournamentId};

    use super::{create_table, is_duplicate_key};

    #[test]
    fn test_is_duplicate_key() {
        assert!(is_duplicate_key(Some("23000")));
        assert!(!is_duplicate_key(Some("42S02")));
        assert!(!is_duplicate_key(None));
    }

    #[test]
    fn test_create_table() {
        let sql = create_table("ko_");
        assert!(sql.contains("ko_tournaments"));
        assert!(sql.contains("data LONGBLOB NOT NULL"));
    }

    #[test]
    fn test_large_tournament_exceeds_blob() {
        let mut tournament = Tournament::new(TournamentId(1), "Cup", 1024, None).unwrap();
        for i in 0..1024 {
            tournament.register(format!("Team {}", i)).unwrap();
        }
        tournament.start(Some(1)).unwrap();

        let data = serde_json::to_vec(&tournament).unwrap();
        assert!(data.len() > usize::from(u16::MAX));
    }
}
