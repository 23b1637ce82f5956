//! Catalog endpoints. Stock never changes here.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tally_core::{NewProduct, Product, ProductUpdate};

use super::ApiResult;
use crate::actor::CurrentActor;
use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// POST /products
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let Json(input) = body?;
    let product = state.engine.create_product(&actor, &input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products?includeInactive=true
pub async fn list(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    query: Result<Query<ListProductsQuery>, QueryRejection>,
) -> ApiResult<Vec<Product>> {
    let Query(query) = query?;
    let products = state.engine.list_products(&actor, query.include_inactive).await?;
    Ok(Json(products))
}

/// GET /products/{id}
pub async fn get(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Product> {
    Ok(Json(state.engine.get_product(&actor, &id).await?))
}

/// PUT /products/{id}
pub async fn update(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Result<Json<ProductUpdate>, JsonRejection>,
) -> ApiResult<Product> {
    let Json(update) = body?;
    Ok(Json(state.engine.update_product_details(&actor, &id, &update).await?))
}

/// DELETE /products/{id}
///
/// Deactivates; the product and its ledger stay.
pub async fn deactivate(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.engine.deactivate_product(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
