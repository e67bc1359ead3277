// src/handlers/clients.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::client::{ClientList, ClientListQuery, ClientPayload, ReorderPayload, VariantView},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteClientResponse {
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

// GET /api/clients
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clients",
    params(ClientListQuery),
    responses(
        (status = 200, description = "Página de clientes ativos", body = ClientList),
        (status = 404, description = "Usuário sem empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<ClientListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let list = app_state
        .client_service
        .list_clients(tenant.0, query)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(list)))
}

// POST /api/clients
#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "Clients",
    request_body = ClientPayload,
    responses(
        (status = 201, description = "Cliente criado", body = VariantView),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Identificador legal ou VAT já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let client = app_state
        .client_service
        .create_client(tenant.0, Some(user.0.user_id), payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tracing::info!(
        business_id = %tenant.0,
        client_id = %client.common().id,
        variant = client.variant().as_str(),
        "Cliente criado"
    );

    Ok((StatusCode::CREATED, Json(client)))
}

// GET /api/clients/{id}
#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente expandido", body = VariantView),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_client(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let client = app_state
        .client_service
        .get_client(tenant.0, id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(client)))
}

// PUT /api/clients/{id}
#[utoipa::path(
    put,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = ClientPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = VariantView),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Cliente não encontrado"),
        (status = 409, description = "Identificador legal ou VAT já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let client = app_state
        .client_service
        .update_client(tenant.0, id, payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(client)))
}

// DELETE /api/clients/{id}
#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente desativado", body = DeleteClientResponse),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_client(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let client = app_state
        .client_service
        .delete_client(tenant.0, id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    tracing::info!(business_id = %tenant.0, client_id = %client.id, "Cliente desativado");

    let message = locale.pick(
        "Cliente eliminado correctamente.",
        "Client deleted successfully.",
        "Cliente removido com sucesso.",
    );

    Ok((
        StatusCode::OK,
        Json(DeleteClientResponse {
            id: client.id,
            message: message.to_string(),
        }),
    ))
}

// POST /api/clients/reorder
#[utoipa::path(
    post,
    path = "/api/clients/reorder",
    tag = "Clients",
    request_body = ReorderPayload,
    responses(
        (status = 200, description = "Ordem gravada", body = MessageResponse),
        (status = 400, description = "A lista não corresponde aos clientes ativos")
    ),
    security(("api_jwt" = []))
)]
pub async fn reorder_clients(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<ReorderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .client_service
        .reorder(tenant.0, &payload.ids)
        .await
        .inspect_err(|e| tracing::warn!(business_id = %tenant.0, "Reordenação rejeitada: {}", e))
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick(
        "Orden actualizado correctamente.",
        "Order updated successfully.",
        "Ordem atualizada com sucesso.",
    );

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    ))
}
