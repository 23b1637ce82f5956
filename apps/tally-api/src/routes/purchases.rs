use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tally_core::{NewPurchase, Purchase};

use super::ApiResult;
use crate::actor::CurrentActor;
use crate::error::ApiError;
use crate::AppState;

/// POST /purchases
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    body: Result<Json<NewPurchase>, JsonRejection>,
) -> Result<(StatusCode, Json<Purchase>), ApiError> {
    let Json(input) = body?;
    let purchase = state.engine.create_purchase(&actor, &input).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// GET /purchases/{id}
pub async fn get(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Purchase> {
    Ok(Json(state.engine.get_purchase(&actor, &id).await?))
}

/// DELETE /purchases/{id}
///
/// Reverses the purchase; refused with 409 once its units were sold.
pub async fn delete(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Purchase> {
    Ok(Json(state.engine.delete_purchase(&actor, &id).await?))
}
