//! Stock endpoints: manual movements and ledger queries.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tally_core::{Page, Product, StockBalance, StockReconciliation, StockTransaction};

use super::ApiResult;
use crate::actor::CurrentActor;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementRequest {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// POST /stock/in
pub async fn stock_in(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    body: Result<Json<StockMovementRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StockTransaction>), ApiError> {
    let Json(req) = body?;
    let entry = state
        .engine
        .stock_in(&actor, &req.product_id, req.quantity, req.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /stock/out
pub async fn stock_out(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    body: Result<Json<StockMovementRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StockTransaction>), ApiError> {
    let Json(req) = body?;
    let entry = state
        .engine
        .stock_out(&actor, &req.product_id, req.quantity, req.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /stock/{product_id}
pub async fn current(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(product_id): Path<String>,
) -> ApiResult<StockBalance> {
    Ok(Json(state.engine.current_stock(&actor, &product_id).await?))
}

/// GET /stock/history/{product_id}?page=1&pageSize=20
pub async fn history(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(product_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Page<StockTransaction>> {
    let Query(query) = query?;
    let page = state
        .engine
        .stock_history(&actor, &product_id, query.page, query.page_size)
        .await?;
    Ok(Json(page))
}

/// GET /stock/low
pub async fn low(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Vec<Product>> {
    Ok(Json(state.engine.low_stock(&actor).await?))
}

/// GET /stock/{product_id}/reconcile
pub async fn reconcile(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(product_id): Path<String>,
) -> ApiResult<StockReconciliation> {
    Ok(Json(state.engine.reconcile_stock(&actor, &product_id).await?))
}
