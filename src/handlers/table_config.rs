// src/handlers/table_config.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::table_config::{
        SaveTableConfigPayload, TableConfig, TableConfigQuery, TableConfigResponse,
    },
};

// GET /api/table-config?tableId=...
#[utoipa::path(
    get,
    path = "/api/table-config",
    tag = "Table config",
    params(TableConfigQuery),
    responses(
        (status = 200, description = "Configuração salva (ou null)", body = TableConfigResponse)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_table_config(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(query): Query<TableConfigQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = app_state
        .table_config_repo
        .get_config(user.0.user_id, query.table_id.trim())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((
        StatusCode::OK,
        Json(TableConfigResponse {
            config: saved.map(|c| c.config),
        }),
    ))
}

// PUT /api/table-config
#[utoipa::path(
    put,
    path = "/api/table-config",
    tag = "Table config",
    request_body = SaveTableConfigPayload,
    responses(
        (status = 200, description = "Configuração salva", body = TableConfig),
        (status = 400, description = "tableId vazio ou config não é um objeto")
    ),
    security(("api_jwt" = []))
)]
pub async fn save_table_config(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<SaveTableConfigPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .check()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let saved = app_state
        .table_config_repo
        .save_config(user.0.user_id, payload.table_id.trim(), &payload.config)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(saved)))
}
