// src/models/business.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::models::client::required;

// ---
// 1. Business (a empresa dona dos clientes)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: Uuid,
    #[schema(example = "Acme Soluciones")]
    pub name: String,
    #[schema(example = "B12345678")]
    pub tax_id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    #[schema(example = "active")]
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// O pouco que a tela precisa saber da empresa do usuário.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSummary {
    pub id: Uuid,
    pub name: String,
    pub status: String,
}

impl From<Business> for BusinessSummary {
    fn from(business: Business) -> Self {
        Self {
            id: business.id,
            name: business.name,
            status: business.status,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusinessResponse {
    pub business: Option<BusinessSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCheckResponse {
    pub has_business: bool,
}

// ---
// 2. Payload do assistente de configuração
// ---
// Strings vazias chegam como `None`
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessPayload {
    #[validate(length(max = 200, message = "too_long"))]
    #[schema(example = "Acme Soluciones")]
    pub name: String,

    #[serde(default, deserialize_with = "crate::models::client::empty_string_as_none")]
    #[validate(length(max = 50, message = "too_long"))]
    #[schema(example = "B12345678")]
    pub tax_id: Option<String>,

    #[serde(default, deserialize_with = "crate::models::client::empty_string_as_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "crate::models::client::empty_string_as_none")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "crate::models::client::empty_string_as_none")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "crate::models::client::empty_string_as_none")]
    pub province: Option<String>,
    #[serde(default, deserialize_with = "crate::models::client::empty_string_as_none")]
    pub country: Option<String>,

    #[serde(default, deserialize_with = "crate::models::client::empty_string_as_none")]
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "info@acme.es")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "crate::models::client::empty_string_as_none")]
    pub phone: Option<String>,

    #[serde(default, deserialize_with = "crate::models::client::empty_string_as_none")]
    #[validate(url(message = "invalid_url"))]
    #[schema(example = "https://acme.es")]
    pub website: Option<String>,
}

impl CreateBusinessPayload {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if self.name.trim().is_empty() {
            errors.add("name", required());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
