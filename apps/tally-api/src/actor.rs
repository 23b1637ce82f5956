//! Acting user, taken from headers set by the upstream authentication proxy.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tally_core::{Actor, Role};

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The authenticated [`Actor`] of a request.
///
/// Both `X-Actor-Id` and `X-Actor-Role` are required; a missing or
/// unreadable header is `UNAUTHENTICATED`, an unknown role is a
/// validation error.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)?;
        let role: Role = header(parts, ACTOR_ROLE_HEADER)?
            .parse()
            .map_err(|e: tally_core::ValidationError| ApiError::validation(e.to_string()))?;
        Ok(CurrentActor(Actor::new(id, role)))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::unauthenticated(format!("Missing {name} header")))
}
