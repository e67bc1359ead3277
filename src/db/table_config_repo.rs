// src/db/table_config_repo.rs

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::table_config::TableConfig};

#[derive(Clone)]
pub struct TableConfigRepository {
    pool: PgPool,
}

impl TableConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_config(
        &self,
        user_id: Uuid,
        table_id: &str,
    ) -> Result<Option<TableConfig>, AppError> {
        let config = sqlx::query_as::<_, TableConfig>(
            "SELECT * FROM table_configs WHERE user_id = $1 AND table_id = $2",
        )
        .bind(user_id)
        .bind(table_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    pub async fn save_config(
        &self,
        user_id: Uuid,
        table_id: &str,
        config: &Value,
    ) -> Result<TableConfig, AppError> {
        // UPSERT (Insert or Update)
        let saved = sqlx::query_as::<_, TableConfig>(
            r#"
            INSERT INTO table_configs (user_id, table_id, config)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, table_id)
            DO UPDATE SET
                config = EXCLUDED.config,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(table_id)
        .bind(config)
        .fetch_one(&self.pool)
        .await?;

        Ok(saved)
    }
}
