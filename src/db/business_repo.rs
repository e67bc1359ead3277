// src/db/business_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_write_error, error::AppError},
    models::business::{Business, CreateBusinessPayload},
};

#[derive(Clone)]
pub struct BusinessRepository {
    pool: PgPool,
}

impl BusinessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A empresa ligada ao usuário, se houver.
    pub async fn find_for_user(&self, user_id: Uuid) -> Result<Option<Business>, AppError> {
        let business = sqlx::query_as::<_, Business>(
            r#"
            SELECT b.*
            FROM businesses b
            JOIN users u ON u.business_id = b.id
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(business)
    }

    /// `Err(UserNotFound)` quando o usuário não existe; `Ok(None)` quando
    /// ainda não configurou a empresa.
    pub async fn business_id_for_user(&self, user_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let row: Option<(Option<Uuid>,)> =
            sqlx::query_as("SELECT business_id FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((business_id,)) => Ok(business_id),
            None => Err(AppError::UserNotFound),
        }
    }

    pub async fn tax_id_exists(&self, tax_id: &str) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM businesses WHERE LOWER(tax_id) = LOWER($1))",
        )
        .bind(tax_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn create_business<'e, E>(
        &self,
        executor: E,
        payload: &CreateBusinessPayload,
    ) -> Result<Business, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Business>(
            r#"
            INSERT INTO businesses (
                name, tax_id, address, city, postal_code, province, country,
                email, phone, website, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'active')
            RETURNING *
            "#,
        )
        .bind(payload.name.trim())
        .bind(payload.tax_id.as_deref())
        .bind(payload.address.as_deref())
        .bind(payload.city.as_deref())
        .bind(payload.postal_code.as_deref())
        .bind(payload.province.as_deref())
        .bind(payload.country.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.phone.as_deref())
        .bind(payload.website.as_deref())
        .fetch_one(executor)
        .await
        .map_err(map_write_error)
    }

    /// Liga o usuário à empresa. Só funciona se ele ainda não tiver nenhuma;
    /// devolve `false` caso contrário.
    pub async fn link_user<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        business_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET business_id = $2, updated_at = NOW()
            WHERE id = $1 AND business_id IS NULL
            "#,
        )
        .bind(user_id)
        .bind(business_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
