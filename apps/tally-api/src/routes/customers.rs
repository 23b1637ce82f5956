use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tally_core::{Coupon, Customer, NewCustomer};

use super::ApiResult;
use crate::actor::CurrentActor;
use crate::error::ApiError;
use crate::AppState;

/// POST /customers
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    body: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let Json(input) = body?;
    let customer = state.engine.create_customer(&actor, &input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /customers/{id}
pub async fn get(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Customer> {
    Ok(Json(state.engine.get_customer(&actor, &id).await?))
}

/// GET /customers/{id}/coupons
pub async fn coupons(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> ApiResult<Vec<Coupon>> {
    Ok(Json(state.engine.customer_coupons(&actor, &id).await?))
}
