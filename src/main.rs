//! Storefront backend - service entry point.

use anyhow::Result;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::http::{categories, offers, orders, products, reviews, users};
use storefront::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&std::env::var("DATABASE_URL")?)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match std::env::var("NATS_URL") {
        Ok(url) => match async_nats::connect(&url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events disabled");
                None
            }
        },
        Err(_) => None,
    };
    let state = AppState { db, nats };

    let app = Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }),
        )
        .route("/api/v1/users", get(users::list).post(users::register))
        .route("/api/v1/users/:id", get(users::get).delete(users::delete))
        .route("/api/v1/categories", get(categories::list).post(categories::create))
        .route(
            "/api/v1/categories/:id",
            get(categories::get).delete(categories::delete),
        )
        .route("/api/v1/products", get(products::list).post(products::create))
        .route(
            "/api/v1/products/:id",
            get(products::get).put(products::update).delete(products::deactivate),
        )
        .route("/api/v1/products/:id/stock", post(products::adjust_stock))
        .route(
            "/api/v1/products/:id/reviews",
            get(reviews::list_for_product).post(reviews::create),
        )
        .route("/api/v1/reviews/:id", delete(reviews::deactivate))
        .route("/api/v1/offers", get(offers::list).post(offers::create))
        .route("/api/v1/offers/code/:code", get(offers::get_by_code))
        .route("/api/v1/offers/:id/deactivate", post(offers::deactivate))
        .route("/api/v1/orders", get(orders::list).post(orders::create))
        .route("/api/v1/orders/:id", get(orders::get).delete(orders::delete))
        .route("/api/v1/orders/:id/status", put(orders::update_status))
        .route("/api/v1/orders/by-number/:number", get(orders::get_by_number))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("storefront listening on 0.0.0.0:{}", port);
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?,
        app,
    )
    .await?;
    Ok(())
}
