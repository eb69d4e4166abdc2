use axum::{middleware::from_fn, routing::get, Router};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod middleware;
mod serializers;
mod session;
mod sso;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, SSO_SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = crate::config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting CityRising API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("CITYRISING_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("CityRising API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        .route("/health", get(health))
        // App shell, choice form, crawler surfaces
        .merge(page_routes())
        // JSON resource APIs (reads open, writes authenticated)
        .merge(api_routes())
        // External GIS pass-through
        .merge(gis_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn page_routes() -> Router {
    use handlers::pages;

    Router::new()
        .route("/", get(pages::app_shell))
        .route(
            "/choose-neighborhood",
            get(pages::choose_show).post(pages::choose_submit),
        )
        .route("/sitemap.xml", get(pages::sitemap))
        .route("/robots.txt", get(pages::robots))
}

fn api_routes() -> Router {
    use axum::routing::post;
    use handlers::api::{actions, auth, users};

    Router::new()
        .route("/api/users", get(users::list).post(users::post))
        .route(
            "/api/users/:id",
            get(users::get)
                .put(users::patch)
                .patch(users::patch)
                .delete(users::delete),
        )
        .route("/api/actions", get(actions::list).post(actions::post))
        .route(
            "/api/actions/:id",
            get(actions::get)
                .put(actions::patch)
                .patch(actions::patch)
                .delete(actions::delete),
        )
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/token", post(auth::token))
        // Resolve the caller (Bearer JWT or session cookie) for every API route
        .layer(from_fn(middleware::auth::resolve_auth_middleware))
}

fn gis_routes() -> Router {
    Router::new().route("/gis/*path", get(handlers::gis::proxy))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
