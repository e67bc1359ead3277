// src/common/db_utils.rs

use crate::{common::error::AppError, models::client::IdentityField};

// Nomes dos índices únicos criados nas migrações
pub(crate) const CLIENT_LEGAL_IDENTIFIER_INDEX: &str = "clients_business_legal_identifier_key";
pub(crate) const CLIENT_VAT_ID_INDEX: &str = "clients_business_vat_id_key";
pub(crate) const CLIENT_POSITION_INDEX: &str = "clients_business_position_key";
pub(crate) const BUSINESS_TAX_ID_INDEX: &str = "businesses_tax_id_key";

/// Converte a violação de chave única num erro atribuído ao campo certo.
///
/// É a última barreira: a checagem de unicidade do serviço já deveria ter
/// barrado o valor, mas duas escritas concorrentes podem passar juntas.
pub(crate) fn map_write_error(e: sqlx::Error) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            if let Some(err) = unique_violation_error(db_err.constraint()) {
                return err;
            }
        }
    }
    e.into()
}

fn unique_violation_error(constraint: Option<&str>) -> Option<AppError> {
    match constraint? {
        CLIENT_LEGAL_IDENTIFIER_INDEX => Some(AppError::UniquenessConflict(IdentityField::LegalIdentifier)),
        CLIENT_VAT_ID_INDEX => Some(AppError::UniquenessConflict(IdentityField::VatId)),
        CLIENT_POSITION_INDEX => Some(AppError::PositionConflict),
        BUSINESS_TAX_ID_INDEX => Some(AppError::BusinessTaxIdExists),
        _ => None,
    }
}
