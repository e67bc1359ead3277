// src/services/business_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::BusinessRepository,
    models::business::{Business, CreateBusinessPayload},
};

#[derive(Clone)]
pub struct BusinessService {
    repo: BusinessRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl BusinessService {
    pub fn new(repo: BusinessRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn find_for_user(&self, user_id: Uuid) -> Result<Option<Business>, AppError> {
        self.repo.find_for_user(user_id).await
    }

    pub async fn has_business(&self, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self.repo.business_id_for_user(user_id).await?.is_some())
    }

    /// A empresa (tenant) do usuário; sem empresa, `BusinessNotFound`.
    pub async fn resolve_business_id(&self, user_id: Uuid) -> Result<Uuid, AppError> {
        self.repo
            .business_id_for_user(user_id)
            .await?
            .ok_or(AppError::BusinessNotFound)
    }

    /// Cria a empresa do assistente de configuração e, atomicamente,
    /// liga o usuário a ela.
    pub async fn create_business_for_user(
        &self,
        user_id: Uuid,
        payload: CreateBusinessPayload,
    ) -> Result<Business, AppError> {
        payload.check()?;

        if self.repo.business_id_for_user(user_id).await?.is_some() {
            return Err(AppError::BusinessAlreadyExists);
        }

        if let Some(tax_id) = payload.tax_id.as_deref() {
            if self.repo.tax_id_exists(tax_id).await? {
                return Err(AppError::BusinessTaxIdExists);
            }
        }

        let mut tx = self.pool.begin().await?;

        let business = self.repo.create_business(&mut *tx, &payload).await?;

        // Outra requisição pode ter ligado o usuário entre a checagem e aqui
        if !self.repo.link_user(&mut *tx, user_id, business.id).await? {
            return Err(AppError::BusinessAlreadyExists);
        }

        tx.commit().await?;

        Ok(business)
    }
}
