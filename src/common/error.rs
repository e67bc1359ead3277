// src/common/error.rs

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{middleware::i18n::Locale, models::client::IdentityField};

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Todo erro do núcleo carrega um "kind", um campo opcional e uma mensagem.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Identificador legal ou VAT já usado por outro cliente da mesma empresa
    #[error("Valor duplicado no campo {}", .0.as_str())]
    UniquenessConflict(IdentityField),

    // Mesma resposta para "não existe" e "pertence a outra empresa"
    #[error("Registro não encontrado")]
    NotFound,

    #[error("A lista de reordenação não corresponde aos clientes da empresa")]
    ReorderMismatch,

    // Duas escritas concorrentes disputaram a mesma posição na ordenação
    #[error("Posição de ordenação já ocupada")]
    PositionConflict,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Nenhuma empresa associada ao usuário")]
    BusinessNotFound,

    #[error("O usuário já possui uma empresa")]
    BusinessAlreadyExists,

    #[error("Já existe uma empresa com este CIF/NIF")]
    BusinessTaxIdExists,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Código estável do tipo de erro, usado pelo frontend para decidir o que mostrar.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::UniquenessConflict(_) | AppError::BusinessTaxIdExists => "uniqueness_conflict",
            AppError::NotFound => "not_found",
            AppError::ReorderMismatch => "reorder_mismatch",
            AppError::InvalidToken | AppError::JwtError(_) => "unauthorized",
            AppError::UserNotFound => "user_not_found",
            AppError::BusinessNotFound => "business_not_found",
            AppError::BusinessAlreadyExists | AppError::PositionConflict => "conflict",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal_error",
        }
    }

    /// Campo do formulário ao qual o erro deve ser atribuído, quando houver.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            AppError::UniquenessConflict(field) => Some(field.as_str()),
            AppError::BusinessTaxIdExists => Some("taxId"),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::ReorderMismatch => StatusCode::BAD_REQUEST,
            AppError::UniquenessConflict(_)
            | AppError::BusinessAlreadyExists
            | AppError::BusinessTaxIdExists
            | AppError::PositionConflict => StatusCode::CONFLICT,
            AppError::NotFound | AppError::UserNotFound | AppError::BusinessNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidToken | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte o erro numa resposta HTTP no idioma do usuário.
    pub fn to_api_error(self, locale: &Locale) -> ApiError {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let details = match &self {
            AppError::ValidationError(errors) => Some(validation_details(errors)),
            _ => None,
        };

        ApiError {
            status,
            error: self.kind().to_string(),
            message: self.localized_message(locale),
            field: self.field().map(str::to_string),
            details,
        }
    }

    fn localized_message(&self, locale: &Locale) -> String {
        let text = match self {
            AppError::ValidationError(_) => locale.pick(
                "Uno o más campos no son válidos.",
                "One or more fields are invalid.",
                "Um ou mais campos são inválidos.",
            ),
            AppError::UniquenessConflict(IdentityField::LegalIdentifier) => locale.pick(
                "Ya existe un cliente con este NIF/CIF.",
                "A client with this tax or national id already exists.",
                "Já existe um cliente com este documento.",
            ),
            AppError::UniquenessConflict(IdentityField::VatId) => locale.pick(
                "Ya existe un cliente con este VAT ID.",
                "A client with this VAT id already exists.",
                "Já existe um cliente com este VAT ID.",
            ),
            AppError::NotFound => locale.pick(
                "Cliente no encontrado.",
                "Client not found.",
                "Cliente não encontrado.",
            ),
            AppError::ReorderMismatch => locale.pick(
                "Algunos clientes no existen o no pertenecen a tu negocio.",
                "Some clients do not exist or do not belong to your business.",
                "Alguns clientes não existem ou não pertencem à sua empresa.",
            ),
            AppError::InvalidToken | AppError::JwtError(_) => locale.pick(
                "No autorizado.",
                "Invalid or missing authentication token.",
                "Token de autenticação inválido ou ausente.",
            ),
            AppError::UserNotFound => locale.pick(
                "Usuario no encontrado.",
                "User not found.",
                "Usuário não encontrado.",
            ),
            AppError::BusinessNotFound => locale.pick(
                "No se encontró un negocio asociado.",
                "No business is associated with this user.",
                "Nenhuma empresa associada ao usuário.",
            ),
            AppError::BusinessAlreadyExists => locale.pick(
                "El usuario ya tiene un negocio.",
                "This user already has a business.",
                "O usuário já possui uma empresa.",
            ),
            AppError::BusinessTaxIdExists => locale.pick(
                "Ya existe un negocio con este CIF/NIF.",
                "A business with this tax id already exists.",
                "Já existe uma empresa com este documento.",
            ),
            AppError::PositionConflict => locale.pick(
                "Otro cambio se guardó al mismo tiempo. Inténtalo de nuevo.",
                "Another change was saved at the same time. Please try again.",
                "Outra alteração foi salva ao mesmo tempo. Tente novamente.",
            ),
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => locale.pick(
                "Ha ocurrido un error inesperado.",
                "An unexpected error occurred.",
                "Ocorreu um erro inesperado.",
            ),
        };
        text.to_string()
    }
}

// Retorna todos os detalhes da validação, com as chaves no formato do frontend (camelCase).
fn validation_details(errors: &validator::ValidationErrors) -> Value {
    let mut details: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (field, field_errors) in errors.field_errors() {
        let messages = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        details.insert(camel_case(&field), messages);
    }
    json!(details)
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// A resposta de erro que efetivamente sai pela API
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: String,
    pub field: Option<String>,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.error,
            "message": self.message,
        });
        if let Some(field) = self.field {
            body["field"] = json!(field);
        }
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}
