mod matches;
mod teams;

use chrono::NaiveDate;
use hyper::Method;
use knockout_core::{Tournament, TournamentId, TournamentPatch};
use serde::Deserialize;

use crate::http::{Request, RequestUri, Response, Result};
use crate::store::id;
use crate::{method, Error, StatusCodeError};

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take() {
        None => method!(req, {
            Method::GET => list(req).await,
            Method::POST => create(req).await,
        }),
        Some(part) => {
            let id = part.parse()?;

            match uri.take_str() {
                None => method!(req, {
                    Method::GET => get(req, id).await,
                    Method::PATCH => patch(req, id).await,
                    Method::DELETE => delete(req, id).await,
                }),
                Some("teams") => teams::route(req, uri, id).await,
                Some("matches") => matches::route(req, uri, id).await,
                Some("start") => match uri.take_str() {
                    None => method!(req, {
                        Method::POST => start(req, id).await,
                    }),
                    Some(_) => Err(StatusCodeError::not_found().into()),
                },
                Some(_) => Err(StatusCodeError::not_found().into()),
            }
        }
    }
}

/// Loads the tournament with the given `id`, returning `404 Not Found` if it doesn't exist.
async fn load(req: &Request, id: TournamentId) -> std::result::Result<Tournament, Error> {
    match req.state().store.get(id).await? {
        Some(tournament) => Ok(tournament),
        None => Err(StatusCodeError::not_found()
            .message("Invalid tournament id")
            .into()),
    }
}

#[derive(Clone, Debug, Deserialize)]
struct CreateTournament {
    name: String,
    max_teams: usize,
    #[serde(default)]
    start_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct StartTournament {
    #[serde(default)]
    seed: Option<u64>,
}

async fn list(req: Request) -> Result {
    let tournaments = req.state().store.list().await?;

    Ok(Response::ok().json(&tournaments))
}

async fn create(mut req: Request) -> Result {
    req.require_admin()?;

    let body: CreateTournament = req.json().await?;

    let tournament = Tournament::new(id::tournament(), body.name, body.max_teams, body.start_date)?;
    req.state().store.insert(&tournament).await?;

    log::info!("Created tournament {} ({:?})", tournament.id, tournament.name);

    Ok(Response::created().json(&tournament))
}

async fn get(req: Request, id: TournamentId) -> Result {
    let caller = req.caller()?;

    let tournament = load(&req, id).await?;

    Ok(Response::ok().json(&tournament.redacted(&caller)))
}

async fn patch(mut req: Request, id: TournamentId) -> Result {
    let caller = req.require_admin()?;

    let patch: TournamentPatch = req.json().await?;

    let mut tournament = load(&req, id).await?;
    tournament.update(patch)?;
    req.state().store.save(&mut tournament).await?;

    Ok(Response::ok().json(&tournament.redacted(&caller)))
}

async fn delete(req: Request, id: TournamentId) -> Result {
    req.require_admin()?;

    if !req.state().store.delete(id).await? {
        return Err(StatusCodeError::not_found()
            .message("Invalid tournament id")
            .into());
    }

    log::info!("Deleted tournament {}", id);

    Ok(Response::no_content())
}

async fn start(mut req: Request, id: TournamentId) -> Result {
    let caller = req.require_admin()?;

    let body: StartTournament = req.json_or_default().await?;

    let mut tournament = load(&req, id).await?;
    tournament.start(body.seed)?;
    req.state().store.save(&mut tournament).await?;

    log::info!(
        "Started tournament {} with {} teams",
        id,
        tournament.teams().len()
    );

    Ok(Response::ok().json(&tournament.redacted(&caller)))
}
