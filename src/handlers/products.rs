use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    models::Product,
    AppState,
};

// ── GET /hello/ ───────────────────────────────────────────────────────────────

pub async fn hello(State(state): State<AppState>) -> AppResult<&'static str> {
    state.products.diagnostic_mutate_first().await
}

// ── GET /allproducts/ ─────────────────────────────────────────────────────────

pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let start = Instant::now();
    let products = state.products.list_all().await?;

    info!(
        count = products.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Listed products"
    );

    Ok(Json(products))
}

// ── GET /products/:id/ ────────────────────────────────────────────────────────

pub async fn get_product(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Product>> {
    let id = parse_id(&raw_id)
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", raw_id)))?;

    let start = Instant::now();
    let product = state.products.get_by_id(id).await?;

    info!(id, elapsed_ms = start.elapsed().as_millis(), "Fetched product");

    Ok(Json(product))
}

/// Only plain digit runs name a product; anything else simply doesn't match.
fn parse_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

// ── POST /product/ ────────────────────────────────────────────────────────────

pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let Json(body) = payload?;

    let start = Instant::now();
    let product = state.products.create(&body).await?;

    info!(
        id = product.id,
        name = %product.name,
        elapsed_ms = start.elapsed().as_millis(),
        "Created product"
    );

    Ok((StatusCode::CREATED, Json(product)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
        Router,
    };
    use serde_json::json;
    use sqlx::SqlitePool;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        build_router,
        db::{memory_pool, SqliteProductStore},
        services::ProductService,
    };

    fn app(pool: SqlitePool) -> Router {
        let store = SqliteProductStore::new(pool);
        build_router(AppState {
            products: ProductService::new(Arc::new(store)),
        })
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        if body.is_some() {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        let request = request
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn json_of(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn ids_must_be_digit_runs() {
        assert_eq!(parse_id("12"), Some(12));
        assert_eq!(parse_id("-1"), None);
        assert_eq!(parse_id("+1"), None);
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id(""), None);
        assert_eq!(parse_id("99999999999999999999999"), None);
    }

    #[tokio::test]
    async fn create_fetch_and_miss() {
        let app = app(memory_pool().await);

        let (status, body) = send(
            &app,
            Method::POST,
            "/product/",
            Some(r#"{"name": "Widget", "price": "9.99"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let created = json_of(&body);
        assert_eq!(created["id"], 1);
        assert_eq!(created["name"], "Widget");
        assert_eq!(created["description"], "");
        assert_eq!(created["price"], "9.99");
        assert_eq!(created["is_available"], false);
        assert!(created["created_at"].is_string());

        let (status, body) = send(&app, Method::GET, "/products/1/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body), created);

        let (status, body) = send(&app, Method::GET, "/products/2/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn hello_renames_first_product() {
        let app = app(memory_pool().await);
        send(
            &app,
            Method::POST,
            "/product/",
            Some(r#"{"name": "Widget", "price": "9.99"}"#),
        )
        .await;

        let (status, body) = send(&app, Method::GET, "/hello/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"hello world");

        let (_, body) = send(&app, Method::GET, "/products/1/", None).await;
        assert_eq!(json_of(&body)["name"], "Apple");
    }

    #[tokio::test]
    async fn hello_on_empty_store_is_not_found() {
        let app = app(memory_pool().await);
        let (status, body) = send(&app, Method::GET, "/hello/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn all_products_lists_everything() {
        let app = app(memory_pool().await);

        let (status, body) = send(&app, Method::GET, "/allproducts/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body), json!([]));

        for body in [r#"{"price": "1"}"#, r#"{"name": "Lamp", "price": "2.5"}"#] {
            send(&app, Method::POST, "/product/", Some(body)).await;
        }

        let (_, body) = send(&app, Method::GET, "/allproducts/", None).await;
        let listed = json_of(&body);
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed
            .iter()
            .any(|p| p["name"] == "Unnamed Product" && p["price"] == "1.00"));
        assert!(listed.iter().any(|p| p["name"] == "Lamp" && p["price"] == "2.50"));
    }

    #[tokio::test]
    async fn invalid_create_lists_field_errors() {
        let app = app(memory_pool().await);
        let (status, body) = send(
            &app,
            Method::POST,
            "/product/",
            Some(r#"{"price": "1234.56", "is_available": "sometimes"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json_of(&body),
            json!({
                "is_available": ["Must be a valid boolean."],
                "price": ["Ensure that there are no more than 5 digits in total."],
            })
        );
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = app(memory_pool().await);
        let (status, body) = send(&app, Method::POST, "/product/", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json_of(&body)["detail"].is_string());
    }

    #[tokio::test]
    async fn create_without_json_content_type_is_unsupported() {
        let app = app(memory_pool().await);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/product/")
            .body(Body::from(r#"{"name": "Widget", "price": "9.99"}"#))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(json_of(&body)["detail"].is_string());

        let (_, body) = send(&app, Method::GET, "/allproducts/", None).await;
        assert_eq!(json_of(&body), json!([]));
    }

    #[tokio::test]
    async fn non_numeric_id_is_not_found() {
        let app = app(memory_pool().await);
        let (status, _) = send(&app, Method::GET, "/products/abc/", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_is_rejected() {
        let app = app(memory_pool().await);
        let (status, _) = send(&app, Method::POST, "/allproducts/", Some("{}")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn closed_store_is_service_unavailable() {
        let pool = memory_pool().await;
        let app = app(pool.clone());
        pool.close().await;

        let (status, body) = send(&app, Method::GET, "/allproducts/", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_of(&body), json!({ "detail": "Store unavailable" }));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app(memory_pool().await);
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_of(&body)["status"], "ok");
    }
}
