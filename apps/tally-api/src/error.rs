//! # API Error Type
//!
//! Every handler error becomes one JSON body:
//!
//! ```json
//! {
//!   "code": "OUT_OF_STOCK",
//!   "message": "Out of stock: 2 item(s) cannot be fulfilled",
//!   "details": [{ "productId": "...", "available": 1, "requested": 3 }]
//! }
//! ```
//!
//! ## Status Mapping
//! ```text
//! ┌───────────────────────────────────────────┬────────┐
//! │ Code                                      │ Status │
//! ├───────────────────────────────────────────┼────────┤
//! │ VALIDATION_ERROR                          │  400   │
//! │ UNAUTHENTICATED                           │  401   │
//! │ FORBIDDEN                                 │  403   │
//! │ NOT_FOUND                                 │  404   │
//! │ INSUFFICIENT_STOCK, OUT_OF_STOCK,         │  409   │
//! │ REVERSAL_CONFLICT, INVALID_STATUS,        │        │
//! │ PRODUCT_INACTIVE, CONCURRENCY_CONFLICT    │        │
//! │ INVALID_COUPON, COUPON_NOT_FOUND,         │  422   │
//! │ COUPON_EXPIRED, COUPON_ALREADY_USED       │        │
//! │ DATABASE_ERROR                            │  500   │
//! └───────────────────────────────────────────┴────────┘
//! ```
//!
//! Storage error text is logged and replaced with a generic message.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_core::{CoreError, StockShortfall};
use tally_ledger::LedgerError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Per-line shortfalls for stock errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ShortfallDetail>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Unauthenticated,
    Forbidden,
    NotFound,
    InsufficientStock,
    OutOfStock,
    ReversalConflict,
    InvalidStatus,
    ProductInactive,
    ConcurrencyConflict,
    InvalidCoupon,
    CouponNotFound,
    CouponExpired,
    CouponAlreadyUsed,
    DatabaseError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InsufficientStock
            | ErrorCode::OutOfStock
            | ErrorCode::ReversalConflict
            | ErrorCode::InvalidStatus
            | ErrorCode::ProductInactive
            | ErrorCode::ConcurrencyConflict => StatusCode::CONFLICT,
            ErrorCode::InvalidCoupon
            | ErrorCode::CouponNotFound
            | ErrorCode::CouponExpired
            | ErrorCode::CouponAlreadyUsed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortfallDetail {
    pub product_id: String,
    pub product_name: String,
    pub available: i64,
    pub requested: i64,
}

impl From<StockShortfall> for ShortfallDetail {
    fn from(s: StockShortfall) -> Self {
        ShortfallDetail {
            product_id: s.product_id,
            product_name: s.product_name,
            available: s.available,
            requested: s.requested,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthenticated, message)
    }

    fn with_shortfalls(mut self, shortfalls: Vec<StockShortfall>) -> Self {
        self.details = Some(shortfalls.into_iter().map(ShortfallDetail::from).collect());
        self
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::Validation(_) => ApiError::validation(message),
            CoreError::Forbidden { .. } => ApiError::new(ErrorCode::Forbidden, message),
            CoreError::NotFound { .. } => ApiError::new(ErrorCode::NotFound, message),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::OutOfStock { shortfalls } => {
                ApiError::new(ErrorCode::OutOfStock, message).with_shortfalls(shortfalls)
            }
            CoreError::ReversalConflict { shortfalls, .. } => {
                ApiError::new(ErrorCode::ReversalConflict, message).with_shortfalls(shortfalls)
            }
            CoreError::InvalidStatus { .. } => ApiError::new(ErrorCode::InvalidStatus, message),
            CoreError::ProductInactive(_) => ApiError::new(ErrorCode::ProductInactive, message),
            CoreError::InvalidCoupon { .. } => ApiError::new(ErrorCode::InvalidCoupon, message),
            CoreError::CouponNotFound(_) => ApiError::new(ErrorCode::CouponNotFound, message),
            CoreError::CouponExpired(_) => ApiError::new(ErrorCode::CouponExpired, message),
            CoreError::CouponAlreadyUsed(_) => {
                ApiError::new(ErrorCode::CouponAlreadyUsed, message)
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Core(core) => core.into(),
            LedgerError::ConcurrencyConflict { .. } => {
                ApiError::new(ErrorCode::ConcurrencyConflict, err.to_string())
            }
            LedgerError::Db(db) => {
                // Log the actual error but return a generic message
                tracing::error!(error = %db, "Storage operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ValidationError;
    use tally_db::DbError;

    #[test]
    fn test_status_per_code() {
        let cases = [
            (CoreError::not_found("Sale", "s-1"), StatusCode::NOT_FOUND),
            (
                CoreError::Validation(ValidationError::Required {
                    field: "items".to_string(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                CoreError::Forbidden {
                    role: "cashier".to_string(),
                    action: "manage purchases".to_string(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                CoreError::CouponExpired("CPN-ABC123".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CoreError::ProductInactive("p-1".to_string()), StatusCode::CONFLICT),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).code.status(), status);
        }
    }

    #[test]
    fn test_out_of_stock_carries_every_line() {
        let err = ApiError::from(CoreError::OutOfStock {
            shortfalls: vec![
                StockShortfall {
                    product_id: "p-1".to_string(),
                    product_name: "Rice".to_string(),
                    available: 1,
                    requested: 3,
                },
                StockShortfall {
                    product_id: "p-2".to_string(),
                    product_name: "Tea".to_string(),
                    available: 0,
                    requested: 1,
                },
            ],
        });

        assert_eq!(err.code, ErrorCode::OutOfStock);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "OUT_OF_STOCK");
        assert_eq!(json["details"][1]["productId"], "p-2");
        assert_eq!(json["details"][0]["requested"], 3);
    }

    #[test]
    fn test_storage_errors_are_hidden() {
        let err = ApiError::from(LedgerError::Db(DbError::QueryFailed(
            "no such table: sales".to_string(),
        )));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");
        assert!(serde_json::to_value(&err).unwrap().get("details").is_none());
    }

    #[test]
    fn test_conflict_is_409() {
        let err = ApiError::from(LedgerError::conflict("create_sale"));
        assert_eq!(err.code.status(), StatusCode::CONFLICT);
        assert_eq!(err.code, ErrorCode::ConcurrencyConflict);
    }
}
