//! End-to-end HTTP tests against an in-memory database.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tally_api::{app, AppState};
use tally_db::{Database, DbConfig};
use tally_ledger::{Engine, EngineConfig};
use tower::ServiceExt;

async fn test_app() -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    app(AppState::new(Engine::new(db, EngineConfig::default())))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    role: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder
            .header("x-actor-id", format!("{role}-1"))
            .header("x-actor-role", role);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Creates a product and stocks it; returns its id.
async fn stocked_product(app: &Router, sku: &str, price_cents: i64, stock: i64) -> String {
    let (status, product) = send(
        app,
        Method::POST,
        "/products",
        Some("admin"),
        Some(json!({
            "sku": sku,
            "name": format!("Product {sku}"),
            "costPriceCents": price_cents / 2,
            "sellingPriceCents": price_cents,
            "minimumStockLevel": 2,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = product["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        Method::POST,
        "/stock/in",
        Some("manager"),
        Some(json!({ "productId": id, "quantity": stock, "notes": "opening" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    id
}

#[tokio::test]
async fn test_health_reports_database() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_missing_actor_headers_are_unauthenticated() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/products", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_unknown_role_is_a_validation_error() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/products", Some("owner"), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_cashier_cannot_create_products() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/products",
        Some("cashier"),
        Some(json!({ "name": "Tea", "costPriceCents": 100, "sellingPriceCents": 200 })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_sale_returns_receipt_and_moves_stock() {
    let app = test_app().await;
    let tea = stocked_product(&app, "TEA", 50_000, 10).await;

    let (status, receipt) = send(
        &app,
        Method::POST,
        "/sales",
        Some("cashier"),
        Some(json!({
            "paymentMethod": "cash",
            "items": [{ "productId": tea, "quantity": 2 }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["sale"]["invoiceNumber"], "INV-000001");
    assert_eq!(receipt["sale"]["subtotalCents"], 100_000);
    assert_eq!(receipt["sale"]["taxCents"], 10_000);
    assert_eq!(receipt["sale"]["grandTotalCents"], 110_000);
    assert_eq!(receipt["warnings"], json!([]));

    let (status, balance) = send(
        &app,
        Method::GET,
        &format!("/stock/{tea}"),
        Some("cashier"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["currentStock"], 8);

    let (status, history) = send(
        &app,
        Method::GET,
        &format!("/stock/history/{tea}?page=1&pageSize=10"),
        Some("manager"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_out_of_stock_lists_shortfalls() {
    let app = test_app().await;
    let tea = stocked_product(&app, "TEA", 1_000, 1).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/sales",
        Some("cashier"),
        Some(json!({
            "paymentMethod": "card",
            "items": [{ "productId": tea, "quantity": 3 }],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "OUT_OF_STOCK");
    assert_eq!(body["details"][0]["productId"], tea.as_str());
    assert_eq!(body["details"][0]["available"], 1);
    assert_eq!(body["details"][0]["requested"], 3);
}

#[tokio::test]
async fn test_low_stock_route_is_not_a_product_id() {
    let app = test_app().await;
    let tea = stocked_product(&app, "TEA", 1_000, 2).await;

    let (status, body) = send(&app, Method::GET, "/stock/low", Some("cashier"), None).await;

    assert_eq!(status, StatusCode::OK);
    let low = body.as_array().unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["id"], tea.as_str());
}

#[tokio::test]
async fn test_coupon_errors_are_unprocessable() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/coupons/validate",
        Some("cashier"),
        Some(json!({ "code": "CPN-NOPE00" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "COUPON_NOT_FOUND");
}

#[tokio::test]
async fn test_generated_coupon_scales_display_value() {
    let app = test_app().await;
    let (status, customer) = send(
        &app,
        Method::POST,
        "/customers",
        Some("manager"),
        Some(json!({ "firstName": "Ayesha" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let customer_id = customer["id"].as_str().unwrap().to_string();

    let (status, coupon) = send(
        &app,
        Method::POST,
        "/coupons/generate",
        Some("manager"),
        Some(json!({
            "customerId": customer_id,
            "discountType": "percentage",
            "discountValue": 12.5,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(coupon["discountValue"], 1250);

    let (status, coupons) = send(
        &app,
        Method::GET,
        &format!("/customers/{customer_id}/coupons"),
        Some("cashier"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(coupons.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/sales",
        Some("cashier"),
        Some(json!({ "items": "not-a-list" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_deactivated_product_cannot_be_sold() {
    let app = test_app().await;
    let tea = stocked_product(&app, "TEA", 1_000, 5).await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/products/{tea}"),
        Some("admin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::POST,
        "/sales",
        Some("cashier"),
        Some(json!({
            "paymentMethod": "cash",
            "items": [{ "productId": tea, "quantity": 1 }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "PRODUCT_INACTIVE");
}
