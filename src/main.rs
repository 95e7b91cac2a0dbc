use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;

use crate::config::Config;
use crate::db::SqliteProductStore;
use crate::services::ProductService;

/// Shared application state — cheap to clone (the store sits behind an Arc).
#[derive(Clone)]
pub struct AppState {
    pub products: ProductService,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,product_catalog=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    info!("Opening product store at {}...", config.database_url);
    let pool = db::connect(&config).await?;
    info!("Database connection pool established.");

    info!("Running migrations...");
    db::migrate(&pool).await?;
    info!("Migrations complete.");

    let state = AppState {
        products: ProductService::new(Arc::new(SqliteProductStore::new(pool))),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Health ──────────────────────────────────────────────────────────
        .route("/health", get(handlers::health))

        // ── Products ────────────────────────────────────────────────────────
        .route("/allproducts/", get(handlers::products::list_products))
        .route("/products/:id/", get(handlers::products::get_product))
        .route("/product/", post(handlers::products::create_product))

        // ── Diagnostic (renames the first product; not for production use) ──
        .route("/hello/", get(handlers::products::hello))

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
