//! Sale endpoints.
//!
//! `POST /sales` answers with the receipt: the committed sale, the loyalty
//! outcome and any warnings (a failed loyalty credit does not fail the
//! request).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tally_core::{NewSale, Sale, SaleReceipt, SaleUpdate};

use super::ApiResult;
use crate::actor::CurrentActor;
use crate::error::ApiError;
use crate::AppState;

/// POST /sales
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    body: Result<Json<NewSale>, JsonRejection>,
) -> Result<(StatusCode, Json<SaleReceipt>), ApiError> {
    let Json(input) = body?;
    let receipt = state.engine.create_sale(&actor, &input).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /sales/{id}
pub async fn get(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Sale> {
    Ok(Json(state.engine.get_sale(&actor, &id).await?))
}

/// PUT /sales/{id}
pub async fn update(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Result<Json<SaleUpdate>, JsonRejection>,
) -> ApiResult<Sale> {
    let Json(update) = body?;
    Ok(Json(state.engine.update_sale(&actor, &id, &update).await?))
}

/// DELETE /sales/{id}
///
/// Voids the sale and returns the voided record.
pub async fn delete(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Sale> {
    Ok(Json(state.engine.delete_sale(&actor, &id).await?))
}
