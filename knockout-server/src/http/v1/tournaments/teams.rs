use hyper::Method;
use knockout_core::TournamentId;
use serde::Deserialize;

use super::load;
use crate::http::{Request, RequestUri, Response, Result};
use crate::{method, StatusCodeError};

pub async fn route(req: Request, mut uri: RequestUri<'_>, id: TournamentId) -> Result {
    match uri.take() {
        None => method!(req, {
            Method::POST => register(req, id).await,
        }),
        Some(part) => {
            let name = part.decode()?;

            if uri.take_str().is_some() {
                return Err(StatusCodeError::not_found().into());
            }

            method!(req, {
                Method::DELETE => remove(req, id, &name).await,
            })
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct RegisterTeam {
    name: String,
}

/// Registers a team. Admins can register any team, users only the team in their token.
async fn register(mut req: Request, id: TournamentId) -> Result {
    let caller = req.caller()?;

    let body: RegisterTeam = req.json().await?;

    if !caller.is_admin() {
        match &caller.team {
            None => return Err(StatusCodeError::unauthorized().into()),
            Some(team) if team.trim() != body.name.trim() => {
                return Err(StatusCodeError::forbidden()
                    .message("Only your own team can be registered")
                    .into());
            }
            Some(_) => (),
        }
    }

    let mut tournament = load(&req, id).await?;
    tournament.register(&body.name)?;
    req.state().store.save(&mut tournament).await?;

    log::info!("Registered team {:?} in tournament {}", body.name, id);

    Ok(Response::created().json(&tournament.redacted(&caller)))
}

async fn remove(req: Request, id: TournamentId, name: &str) -> Result {
    let caller = req.require_admin()?;

    let mut tournament = load(&req, id).await?;
    tournament.remove(name)?;
    req.state().store.save(&mut tournament).await?;

    log::info!("Removed team {:?} from tournament {}", name, id);

    Ok(Response::ok().json(&tournament.redacted(&caller)))
}
