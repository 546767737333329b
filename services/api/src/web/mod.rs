pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod weather;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{any, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use auth::{change_password_handler, login_handler};
use middleware::require_auth;
use rest::{
    admin_update_data_handler, api_not_found, config_handler, get_admin_data_handler,
    get_data_handler, update_data_handler, visit_handler, ApiDoc,
};
use state::AppState;
use weather::weather_handler;

/// Builds the complete application: API routes, Swagger UI and, when a
/// public directory is configured, the static front end.
pub fn build_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/login", post(login_handler))
        .route("/api/data", get(get_data_handler))
        .route("/api/visit", post(visit_handler))
        .route("/api/config", get(config_handler))
        .route("/api/weather", get(weather_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/data", put(update_data_handler))
        .route(
            "/api/admin/data",
            get(get_admin_data_handler).put(admin_update_data_handler),
        )
        .route("/api/admin/password", post(change_password_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let mut api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .route("/api", any(api_not_found))
        .route("/api/{*rest}", any(api_not_found));

    if let Some(origin) = &app_state.config.cors_origin {
        let origin = origin.parse::<HeaderValue>().map_err(|e| {
            ApiError::Internal(format!("Invalid CORS origin '{origin}': {e}"))
        })?;
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
        api_router = api_router.layer(cors);
    }

    // Merge the API router with the Swagger UI router for a complete application.
    let mut app = api_router
        .with_state(app_state.clone())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    if let Some(dir) = &app_state.config.public_dir {
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    Ok(app)
}
