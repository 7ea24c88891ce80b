use hyper::Method;
use knockout_core::TournamentId;
use serde::Deserialize;

use super::load;
use crate::http::{Request, RequestUri, Response, Result};
use crate::{method, StatusCodeError};

pub async fn route(req: Request, mut uri: RequestUri<'_>, id: TournamentId) -> Result {
    let (round, index) = match (uri.take(), uri.take(), uri.take_str()) {
        (Some(round), Some(index), None) => (round.parse()?, index.parse()?),
        _ => return Err(StatusCodeError::not_found().into()),
    };

    method!(req, {
        Method::POST => report(req, id, round, index).await,
    })
}

#[derive(Clone, Debug, Deserialize)]
struct ReportResult {
    winner: String,
}

async fn report(mut req: Request, id: TournamentId, round: usize, index: usize) -> Result {
    req.require_admin()?;

    let body: ReportResult = req.json().await?;

    let mut tournament = load(&req, id).await?;
    let outcome = tournament.report_result(round, index, &body.winner)?;
    req.state().store.save(&mut tournament).await?;

    if let Some(champion) = &outcome.champion {
        log::info!("Tournament {} completed, champion is {}", id, champion);
    }

    Ok(Response::ok().json(&outcome))
}
