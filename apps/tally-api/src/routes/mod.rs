//! HTTP routes. Handlers translate JSON to engine calls and back; every
//! business rule lives in `tally-ledger`.

pub mod coupons;
pub mod customers;
pub mod health;
pub mod products;
pub mod purchases;
pub mod sales;
pub mod stock;

use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::ApiError;
use crate::AppState;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    let products = Router::new()
        .route("/products", post(products::create).get(products::list))
        .route(
            "/products/{id}",
            get(products::get).put(products::update).delete(products::deactivate),
        );

    let customers = Router::new()
        .route("/customers", post(customers::create))
        .route("/customers/{id}", get(customers::get))
        .route("/customers/{id}/coupons", get(customers::coupons));

    let sales = Router::new()
        .route("/sales", post(sales::create))
        .route(
            "/sales/{id}",
            get(sales::get).put(sales::update).delete(sales::delete),
        );

    let purchases = Router::new()
        .route("/purchases", post(purchases::create))
        .route("/purchases/{id}", get(purchases::get).delete(purchases::delete));

    let stock = Router::new()
        .route("/stock/in", post(stock::stock_in))
        .route("/stock/out", post(stock::stock_out))
        .route("/stock/low", get(stock::low))
        .route("/stock/history/{product_id}", get(stock::history))
        .route("/stock/{product_id}", get(stock::current))
        .route("/stock/{product_id}/reconcile", get(stock::reconcile));

    let coupons = Router::new()
        .route("/coupons/generate", post(coupons::generate))
        .route("/coupons/validate", post(coupons::validate));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(products)
        .merge(customers)
        .merge(sales)
        .merge(purchases)
        .merge(stock)
        .merge(coupons)
        .with_state(state)
}
