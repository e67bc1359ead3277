// src/services/identity_guard.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::client_repo::ClientStore,
    models::client::{ClientColumns, IdentityField},
};

/// Garante que identificador legal e VAT não se repetem dentro de uma empresa.
///
/// A comparação ignora maiúsculas/minúsculas e inclui clientes inativos.
/// Empresas diferentes podem ter o mesmo valor.
pub struct IdentityGuard<'a> {
    store: &'a dyn ClientStore,
}

impl<'a> IdentityGuard<'a> {
    pub fn new(store: &'a dyn ClientStore) -> Self {
        Self { store }
    }

    pub async fn check_unique(
        &self,
        business_id: Uuid,
        field: IdentityField,
        value: Option<&str>,
        exclude_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Ok(());
        };

        match self
            .store
            .find_identity_owner(business_id, field, value, exclude_id)
            .await?
        {
            Some(_) => Err(AppError::UniquenessConflict(field)),
            None => Ok(()),
        }
    }

    /// Checa os dois campos, identificador legal primeiro.
    pub async fn check_columns(
        &self,
        business_id: Uuid,
        columns: &ClientColumns,
        exclude_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        for field in [IdentityField::LegalIdentifier, IdentityField::VatId] {
            self.check_unique(business_id, field, columns.identity(field), exclude_id)
                .await?;
        }
        Ok(())
    }
}
