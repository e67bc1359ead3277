// src/handlers/business.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::business::{
        Business, BusinessCheckResponse, BusinessResponse, BusinessSummary, CreateBusinessPayload,
    },
};

// GET /api/business
#[utoipa::path(
    get,
    path = "/api/business",
    tag = "Business",
    responses(
        (status = 200, description = "Empresa do usuário (ou null)", body = BusinessResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_my_business(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let business = app_state
        .business_service
        .find_for_user(user.0.user_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((
        StatusCode::OK,
        Json(BusinessResponse {
            business: business.map(BusinessSummary::from),
        }),
    ))
}

// GET /api/business/check
#[utoipa::path(
    get,
    path = "/api/business/check",
    tag = "Business",
    responses(
        (status = 200, description = "Se o usuário já configurou a empresa", body = BusinessCheckResponse),
        (status = 404, description = "Usuário não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn check_business(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let has_business = app_state
        .business_service
        .has_business(user.0.user_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(BusinessCheckResponse { has_business })))
}

// POST /api/business
#[utoipa::path(
    post,
    path = "/api/business",
    tag = "Business",
    request_body = CreateBusinessPayload,
    responses(
        (status = 201, description = "Empresa criada", body = Business),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Usuário já tem empresa ou CIF/NIF duplicado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_business(
    State(app_state): State<AppState>,
    locale: Locale,
    // Precisamos do usuário autenticado para ligá-lo à empresa
    user: AuthenticatedUser,
    Json(payload): Json<CreateBusinessPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let business = app_state
        .business_service
        .create_business_for_user(user.0.user_id, payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tracing::info!(business_id = %business.id, user_id = %user.0.user_id, "Empresa criada");

    Ok((StatusCode::CREATED, Json(business)))
}
