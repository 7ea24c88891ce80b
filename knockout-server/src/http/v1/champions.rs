use chrono::NaiveDate;
use hyper::Method;
use knockout_core::{TournamentId, TournamentStatus};
use serde::Serialize;

use crate::http::{Request, RequestUri, Response, Result};
use crate::{method, StatusCodeError};

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take_str() {
        None => method!(req, {
            Method::GET => list(req).await,
        }),
        Some(_) => Err(StatusCodeError::not_found().into()),
    }
}

/// The winner of a completed tournament.
#[derive(Clone, Debug, Serialize)]
struct Champion {
    id: TournamentId,
    name: String,
    start_date: Option<NaiveDate>,
    winner: String,
}

/// Lists the champions of all completed tournaments, most recent first.
async fn list(req: Request) -> Result {
    let tournaments = req.state().store.list().await?;

    let champions: Vec<_> = tournaments
        .into_iter()
        .rev()
        .filter_map(|t| match (t.status, t.winner) {
            (TournamentStatus::Completed, Some(winner)) => Some(Champion {
                id: t.id,
                name: t.name,
                start_date: t.start_date,
                winner,
            }),
            _ => None,
        })
        .collect();

    Ok(Response::ok().json(&champions))
}
