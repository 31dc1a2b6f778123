use axum::{extract::Extension, middleware, routing::get, Router};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod store;
pub mod tenancy;

/// Build the application router. The tenant scoping middleware wraps every
/// route, so handlers can rely on a `TenantContext` being present in request
/// extensions.
pub fn app(pool: PgPool) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(product_routes())
        .layer(middleware::from_fn(tenancy::tenant_scope_middleware))
        .layer(Extension(pool))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_routes() -> Router {
    use axum::routing::post;
    use handlers::auth;

    Router::new()
        // Pre-auth token acquisition (tenant from header/host)
        .route("/auth/login", post(auth::login))
        // Identity of the validated caller
        .route("/api/auth/whoami", get(auth::whoami))
}

fn product_routes() -> Router {
    use handlers::products;

    Router::new()
        .route(
            "/api/products",
            get(products::list).post(products::create),
        )
        .route(
            "/api/products/:id",
            get(products::get)
                .put(products::update)
                .delete(products::delete),
        )
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Storefront API",
            "version": version,
            "description": "Multi-tenant marketplace backend API built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/login (public - token acquisition), /api/auth/whoami",
                "products": "/api/products[/:id] (tenant-scoped)",
            }
        }
    }))
}

async fn health(Extension(pool): Extension<PgPool>) -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match store::pool::health_check(&pool).await {
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
