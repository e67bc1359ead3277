// src/models/table_config.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::models::client::required;

// Colunas visíveis, larguras, ordem... O formato é do frontend.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub user_id: Uuid,
    #[schema(example = "clients")]
    pub table_id: String,
    #[schema(value_type = Object)]
    pub config: Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TableConfigQuery {
    #[param(example = "clients")]
    pub table_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TableConfigResponse {
    #[schema(value_type = Option<Object>)]
    pub config: Option<Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveTableConfigPayload {
    #[schema(example = "clients")]
    pub table_id: String,
    #[schema(value_type = Object)]
    pub config: Value,
}

impl SaveTableConfigPayload {
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.table_id.trim().is_empty() {
            errors.add("table_id", required());
        }
        if !self.config.is_object() {
            let mut err = ValidationError::new("invalid_object");
            err.message = Some("invalid_object".into());
            errors.add("config", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_must_be_an_object() {
        let payload: SaveTableConfigPayload = serde_json::from_value(json!({
            "tableId": "clients",
            "config": { "columns": ["displayName", "email"] }
        }))
        .unwrap();
        assert!(payload.check().is_ok());

        let payload: SaveTableConfigPayload = serde_json::from_value(json!({
            "tableId": " ",
            "config": [1, 2]
        }))
        .unwrap();
        let errors = payload.check().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("table_id"));
        assert!(fields.contains_key("config"));
    }

    #[test]
    fn saved_config_does_not_expose_user_id() {
        let saved = TableConfig {
            user_id: Uuid::new_v4(),
            table_id: "clients".into(),
            config: json!({ "pageSize": 25 }),
            updated_at: Utc::now(),
        };
        let body = serde_json::to_value(&saved).unwrap();
        assert!(body.get("userId").is_none());
        assert_eq!(body["tableId"], "clients");
        assert_eq!(body["config"]["pageSize"], 25);
    }
}
