mod champions;
mod tournaments;

use crate::http::{Request, RequestUri, Result};
use crate::StatusCodeError;

pub async fn route(req: Request, mut uri: RequestUri<'_>) -> Result {
    match uri.take_str() {
        Some("tournaments") => tournaments::route(req, uri).await,
        Some("champions") => champions::route(req, uri).await,
        _ => Err(StatusCodeError::not_found().into()),
    }
}
