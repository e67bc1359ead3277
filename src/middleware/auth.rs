// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, Header};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::auth::{Claims, Principal},
};

/// Valida o JWT (HS256, segredo compartilhado) e devolve quem está chamando.
pub fn decode_principal(token: &str, secret: &str) -> Result<Principal, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(token_data.claims.into())
}

// Lê o "Authorization: Bearer <token>"
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    Authorization::<Bearer>::decode(&mut headers.get_all(AUTHORIZATION).iter())
        .ok()
        .map(|auth| auth.token().to_string())
}

fn authenticate(app_state: &AppState, headers: &HeaderMap) -> Result<Principal, AppError> {
    let token = bearer_token(headers).ok_or(AppError::InvalidToken)?;
    let principal = decode_principal(&token, &app_state.jwt_secret).inspect_err(|_| {
        tracing::warn!("Token JWT rejeitado");
    })?;

    tracing::debug!(user_id = %principal.user_id, role = ?principal.role, "Requisição autenticada");
    Ok(principal)
}

/// Só autenticação: para as rotas usadas antes de a empresa existir.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal =
        authenticate(&app_state, request.headers()).map_err(|e| e.to_api_error(&locale))?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser(principal));
    Ok(next.run(request).await)
}

/// Autenticação + resolução da empresa (tenant) do usuário.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal =
        authenticate(&app_state, request.headers()).map_err(|e| e.to_api_error(&locale))?;

    let business_id = app_state
        .business_service
        .resolve_business_id(principal.user_id)
        .await
        .inspect_err(|e| {
            if matches!(e, AppError::BusinessNotFound) {
                tracing::debug!(user_id = %principal.user_id, "Usuário sem empresa configurada");
            }
        })
        .map_err(|e| e.to_api_error(&locale))?;

    request.extensions_mut().insert(AuthenticatedUser(principal));
    request.extensions_mut().insert(TenantContext(business_id));
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
