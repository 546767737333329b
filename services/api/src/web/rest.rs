//! services/api/src/web/rest.rs
//!
//! This module contains the REST handlers for the navigation document and
//! the master definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::auth::{self, json_body};
use crate::web::state::AppState;
use crate::web::weather;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::Uri,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::change_password_handler,
        get_data_handler,
        update_data_handler,
        get_admin_data_handler,
        admin_update_data_handler,
        visit_handler,
        config_handler,
        weather::weather_handler,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::LoginResponse,
            auth::ChangePasswordRequest,
            auth::SuccessResponse,
            UpdateDataRequest,
            AdminDataResponse,
            VisitResponse,
            ConfigResponse,
            WeatherConfig,
            weather::WeatherResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Start Page API", description = "Navigation document, admin session and weather endpoints.")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The body accepted by both update endpoints. `settings` is required;
/// an absent collection keeps its current contents.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UpdateDataRequest {
    #[schema(value_type = Object)]
    settings: Value,
    #[schema(value_type = Option<Vec<Object>>)]
    apps: Option<Value>,
    #[schema(value_type = Option<Vec<Object>>)]
    bookmarks: Option<Value>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminDataResponse {
    pub success: bool,
    /// The public projection plus `weatherCity`.
    #[schema(value_type = Object)]
    pub data: startpage_core::domain::AdminView,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitResponse {
    pub success: bool,
    pub visitor_count: u64,
}

#[derive(Serialize, ToSchema)]
pub struct ConfigResponse {
    pub weather: WeatherConfig,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherConfig {
    pub default_city: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Returns the public projection of the navigation document.
#[utoipa::path(
    get,
    path = "/api/data",
    responses(
        (status = 200, description = "Settings, apps, bookmarks and visitorCount"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_data_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.documents.load().await.map_err(|e| {
        error!("Failed to load document: {:?}", e);
        ApiError::from(e)
    })?;
    Ok(Json(document.public_view()))
}

/// Validates and stores an edited document.
#[utoipa::path(
    put,
    path = "/api/data",
    request_body = UpdateDataRequest,
    responses(
        (status = 200, description = "The public projection of the saved document"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer" = []))
)]
pub async fn update_data_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let update = json_body(body)?;
    let document = state.documents.apply_update(&update).await.map_err(|e| {
        debug!("Update rejected or failed: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(document.public_view()))
}

/// Same as `PUT /api/data`, exposed under the admin prefix.
#[utoipa::path(
    put,
    path = "/api/admin/data",
    request_body = UpdateDataRequest,
    responses(
        (status = 200, description = "The public projection of the saved document"),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer" = []))
)]
pub async fn admin_update_data_handler(
    state: State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    update_data_handler(state, body).await
}

/// Returns the document as the editor sees it.
#[utoipa::path(
    get,
    path = "/api/admin/data",
    responses(
        (status = 200, description = "Projection plus resolved weather city", body = AdminDataResponse),
        (status = 401, description = "Missing, invalid or expired token")
    ),
    security(("bearer" = []))
)]
pub async fn get_admin_data_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state.documents.load().await.map_err(|e| {
        error!("Failed to load document: {:?}", e);
        ApiError::from(e)
    })?;
    Ok(Json(AdminDataResponse {
        success: true,
        data: document.admin_view(&state.config.core.default_weather_city),
    }))
}

/// Counts one page view.
#[utoipa::path(
    post,
    path = "/api/visit",
    responses(
        (status = 200, description = "The updated counter", body = VisitResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn visit_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let visitor_count = state.documents.record_visit().await.map_err(|e| {
        error!("Failed to record visit: {:?}", e);
        ApiError::from(e)
    })?;
    Ok(Json(VisitResponse {
        success: true,
        visitor_count,
    }))
}

/// Exposes the client-facing part of the server configuration.
#[utoipa::path(
    get,
    path = "/api/config",
    responses(
        (status = 200, description = "Client configuration", body = ConfigResponse)
    )
)]
pub async fn config_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ConfigResponse {
        weather: WeatherConfig {
            default_city: state.config.core.default_weather_city.clone(),
        },
    })
}

/// Any unmatched path under `/api`.
pub async fn api_not_found(uri: Uri) -> ApiError {
    debug!("No API route for {}", uri.path());
    ApiError::NotFound
}
