//! Coupon endpoints.
//!
//! `discountValue` arrives in display units: a percentage (`12.5` means
//! 12.5%) or currency units (`50.00`). The engine works in basis points and
//! cents, so both are scaled by 100 here.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tally_core::{Coupon, CouponCheck, DiscountType};

use super::ApiResult;
use crate::actor::CurrentActor;
use crate::error::ApiError;
use crate::AppState;

const DEFAULT_EXPIRY_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCouponRequest {
    pub customer_id: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
}

fn default_expiry_days() -> i64 {
    DEFAULT_EXPIRY_DAYS
}

#[derive(Debug, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
}

/// Display units to basis points (percentage) or cents (fixed).
fn scale_discount_value(value: f64) -> Result<i64, ApiError> {
    let scaled = (value * 100.0).round();
    if !scaled.is_finite() || scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
        return Err(ApiError::validation("discountValue is not a usable number"));
    }
    Ok(scaled as i64)
}

/// POST /coupons/generate
pub async fn generate(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    body: Result<Json<GenerateCouponRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Coupon>), ApiError> {
    let Json(req) = body?;
    let value = scale_discount_value(req.discount_value)?;
    let coupon = state
        .engine
        .generate_coupon(
            &actor,
            &req.customer_id,
            req.discount_type,
            value,
            req.expiry_days,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// POST /coupons/validate
pub async fn validate(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    body: Result<Json<ValidateCouponRequest>, JsonRejection>,
) -> ApiResult<CouponCheck> {
    let Json(req) = body?;
    Ok(Json(state.engine.validate_coupon(&actor, &req.code).await?))
}
