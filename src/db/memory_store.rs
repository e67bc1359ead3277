// src/db/memory_store.rs
//
// ClientStore em memória, só para os testes dos serviços.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::client_repo::{like_pattern, variant_patterns, ClientStore},
    models::client::{
        ClientFilter, ClientRecord, ClientStatus, ClientUpdate, CompressedClient, IdentityField,
        NewClient,
    },
};

/// Copia colunas base e side channel para a linha, como o UPDATE faz.
pub fn apply_compressed(record: &mut ClientRecord, compressed: &CompressedClient) {
    let columns = &compressed.columns;
    let address = columns.commercial_address.clone().unwrap_or_default();

    record.display_name = columns.display_name.clone();
    record.trade_name = columns.trade_name.clone();
    record.legal_identifier = columns.legal_identifier.clone();
    record.vat_id = columns.vat_id.clone();
    record.street = address.street;
    record.city = address.city;
    record.postal_code = address.postal_code;
    record.province = address.province;
    record.country = address.country;
    record.email = columns.email.clone();
    record.phone = columns.phone.clone();
    record.mobile = columns.mobile.clone();
    record.website = columns.website.clone();
    record.category = columns.category.clone();
    record.notes = columns.notes.clone();
    record.contact_person = columns.contact_person.clone();
    record.language = columns.language.clone();
    record.currency = columns.currency.clone();
    record.registration_date = columns.registration_date;
    record.birth_date = columns.birth_date;
    record.side_channel = compressed.side_channel.clone();
}

#[derive(Default)]
pub struct MemoryClientStore {
    records: RwLock<Vec<ClientRecord>>,
}

impl MemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insere uma linha pronta (ex.: com side channel corrompido).
    pub async fn insert_raw(&self, record: ClientRecord) {
        self.records.write().await.push(record);
    }

    pub async fn all(&self, business_id: Uuid) -> Vec<ClientRecord> {
        let mut records: Vec<_> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.business_id == business_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.sort_position);
        records
    }
}

fn next_position(records: &[ClientRecord], business_id: Uuid) -> i32 {
    records
        .iter()
        .filter(|r| r.business_id == business_id)
        .map(|r| r.sort_position)
        .max()
        .map_or(0, |max| max + 1)
}

/// `ILIKE` com os padrões do repositório, que só têm curinga nas pontas.
fn ilike(value: &str, pattern: &str) -> bool {
    let inner = pattern
        .strip_prefix('%')
        .and_then(|p| p.strip_suffix('%'))
        .unwrap_or(pattern);

    let mut needle = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => needle.extend(chars.next()),
            c => needle.push(c),
        }
    }
    value.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_search(record: &ClientRecord, pattern: &str) -> bool {
    [
        Some(record.display_name.as_str()),
        record.trade_name.as_deref(),
        record.legal_identifier.as_deref(),
        record.vat_id.as_deref(),
        record.email.as_deref(),
        record.phone.as_deref(),
        record.mobile.as_deref(),
        record.city.as_deref(),
        record.province.as_deref(),
        record.side_channel.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|value| ilike(value, pattern))
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn find_by_id(
        &self,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ClientRecord>, AppError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| r.business_id == business_id && r.id == id)
            .cloned())
    }

    async fn find_many(
        &self,
        business_id: Uuid,
        filter: &ClientFilter,
    ) -> Result<(Vec<ClientRecord>, i64), AppError> {
        let search = like_pattern(filter.search.as_deref());
        let (variant, legacy_variant) = variant_patterns(filter.variant);

        let mut matching: Vec<ClientRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.business_id == business_id && r.status == ClientStatus::Active)
            .filter(|r| search.as_deref().is_none_or(|p| matches_search(r, p)))
            .filter(|r| match (&variant, &legacy_variant) {
                (Some(current), Some(legacy)) => r
                    .side_channel
                    .as_deref()
                    .is_some_and(|side| ilike(side, current) || ilike(side, legacy)),
                _ => true,
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            a.sort_position
                .cmp(&b.sort_position)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn find_identity_owner(
        &self,
        business_id: Uuid,
        field: IdentityField,
        value: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        let value = value.to_lowercase();
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.business_id == business_id && Some(r.id) != exclude_id)
            .find(|r| {
                let stored = match field {
                    IdentityField::LegalIdentifier => r.legal_identifier.as_deref(),
                    IdentityField::VatId => r.vat_id.as_deref(),
                };
                stored.is_some_and(|s| s.to_lowercase() == value)
            })
            .map(|r| r.id))
    }

    async fn active_ids(&self, business_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.business_id == business_id && r.status == ClientStatus::Active)
            .map(|r| r.id)
            .collect())
    }

    async fn create(&self, new_client: &NewClient) -> Result<ClientRecord, AppError> {
        let mut records = self.records.write().await;
        let now = Utc::now();
        let mut record = ClientRecord {
            id: Uuid::new_v4(),
            business_id: new_client.business_id,
            owner_user_id: new_client.owner_user_id,
            display_name: String::new(),
            trade_name: None,
            legal_identifier: None,
            vat_id: None,
            street: None,
            city: None,
            postal_code: None,
            province: None,
            country: None,
            email: None,
            phone: None,
            mobile: None,
            website: None,
            status: ClientStatus::Active,
            category: String::new(),
            notes: None,
            contact_person: None,
            language: None,
            currency: None,
            registration_date: None,
            birth_date: None,
            created_at: now,
            updated_at: now,
            deactivated_at: None,
            sort_position: next_position(&records, new_client.business_id),
            side_channel: None,
        };
        apply_compressed(&mut record, &new_client.client);
        records.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        business_id: Uuid,
        id: Uuid,
        update: &ClientUpdate,
    ) -> Result<Option<ClientRecord>, AppError> {
        let mut records = self.records.write().await;
        let position = next_position(&records, business_id);
        let Some(record) = records
            .iter_mut()
            .find(|r| r.business_id == business_id && r.id == id)
        else {
            return Ok(None);
        };

        apply_compressed(record, &update.client);
        match update.status {
            Some(ClientStatus::Active) if record.status == ClientStatus::Inactive => {
                record.status = ClientStatus::Active;
                record.deactivated_at = None;
                record.sort_position = position;
            }
            Some(ClientStatus::Inactive) if record.status == ClientStatus::Active => {
                record.status = ClientStatus::Inactive;
                record.deactivated_at = Some(Utc::now());
            }
            _ => {}
        }
        record.updated_at = Utc::now();

        Ok(Some(record.clone()))
    }

    async fn deactivate(
        &self,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ClientRecord>, AppError> {
        let mut records = self.records.write().await;
        let Some(record) = records
            .iter_mut()
            .find(|r| r.business_id == business_id && r.id == id)
        else {
            return Ok(None);
        };

        let now = Utc::now();
        record.status = ClientStatus::Inactive;
        record.deactivated_at = Some(now);
        record.updated_at = now;
        Ok(Some(record.clone()))
    }

    async fn batch_update_positions(
        &self,
        business_id: Uuid,
        positions: &[(Uuid, i32)],
    ) -> Result<(), AppError> {
        let mut records = self.records.write().await;

        let all_present = positions.iter().all(|(id, _)| {
            records.iter().any(|r| {
                r.id == *id && r.business_id == business_id && r.status == ClientStatus::Active
            })
        });
        if !all_present {
            return Err(AppError::ReorderMismatch);
        }

        for (id, position) in positions {
            if let Some(record) = records.iter_mut().find(|r| r.id == *id) {
                record.sort_position = *position;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::client::Variant, services::variant_resolver::tests::record_with};

    #[test]
    fn ilike_unescapes_repository_patterns() {
        let pattern = like_pattern(Some("50%_off")).unwrap();
        assert!(ilike("Promo 50%_OFF", &pattern));
        assert!(!ilike("Promo 50 off", &pattern));
    }

    #[tokio::test]
    async fn variant_filter_matches_stored_text_like_the_sql() {
        let store = MemoryClientStore::new();
        let business = Uuid::new_v4();
        let sides = [
            r#"{"variant":"individual"}"#,
            r#"{"tipoCliente":"particular"}"#,
            // Etiqueta válida, mas gravada à mão com espaço: o padrão do SQL não casa
            r#"{"variant": "individual"}"#,
            r#"{"variant":"company"}"#,
        ];
        for (position, side) in sides.into_iter().enumerate() {
            let mut record = record_with(Some(side));
            record.business_id = business;
            record.sort_position = position as i32;
            store.insert_raw(record).await;
        }

        let filter = ClientFilter {
            variant: Some(Variant::Individual),
            limit: 10,
            ..Default::default()
        };
        let (records, total) = store.find_many(business, &filter).await.unwrap();
        assert_eq!(total, 2);
        let positions: Vec<i32> = records.iter().map(|r| r.sort_position).collect();
        assert_eq!(positions, vec![0, 1]);
    }
}
