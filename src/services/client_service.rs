// src/services/client_service.rs

use std::{collections::HashSet, sync::Arc};

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::client_repo::ClientStore,
    models::{
        client::{
            ClientFilter, ClientList, ClientListQuery, ClientPayload, ClientRecord, ClientRow,
            ClientUpdate, NewClient, Pagination, VariantView,
        },
        side_channel::SideChannelState,
    },
    services::{
        identity_guard::IdentityGuard,
        projection::{compress, expand},
    },
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn ClientStore>,
}

impl ClientService {
    pub fn new(store: Arc<dyn ClientStore>) -> Self {
        Self { store }
    }

    fn guard(&self) -> IdentityGuard<'_> {
        IdentityGuard::new(self.store.as_ref())
    }

    /// Cria o cliente já ativo, no fim da ordenação da empresa.
    pub async fn create_client(
        &self,
        business_id: Uuid,
        owner_user_id: Option<Uuid>,
        payload: ClientPayload,
    ) -> Result<VariantView, AppError> {
        payload.check()?;

        let client = compress(&payload.into_input());
        self.guard()
            .check_columns(business_id, &client.columns, None)
            .await?;

        let new_client = NewClient {
            business_id,
            owner_user_id,
            client,
        };
        // A posição é max+1: quem perde a corrida para outra criação tenta mais uma vez
        let record = match self.store.create(&new_client).await {
            Err(AppError::PositionConflict) => {
                tracing::warn!(%business_id, "Conflito de posição ao criar cliente, repetindo");
                self.store.create(&new_client).await?
            }
            other => other?,
        };

        Ok(expand(&record))
    }

    /// Atualização completa: o formulário reenvia o cliente inteiro.
    pub async fn update_client(
        &self,
        business_id: Uuid,
        id: Uuid,
        payload: ClientPayload,
    ) -> Result<VariantView, AppError> {
        payload.check()?;

        if self.store.find_by_id(business_id, id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let status = payload.status;
        let client = compress(&payload.into_input());
        self.guard()
            .check_columns(business_id, &client.columns, Some(id))
            .await?;

        let update = ClientUpdate { client, status };
        let record = match self.store.update(business_id, id, &update).await {
            Err(AppError::PositionConflict) => {
                tracing::warn!(
                    %business_id,
                    client_id = %id,
                    "Conflito de posição ao reativar cliente, repetindo"
                );
                self.store.update(business_id, id, &update).await?
            }
            other => other?,
        }
        .ok_or(AppError::NotFound)?;

        Ok(expand(&record))
    }

    pub async fn get_client(&self, business_id: Uuid, id: Uuid) -> Result<VariantView, AppError> {
        self.store
            .find_by_id(business_id, id)
            .await?
            .map(|record| expand(&record))
            .ok_or(AppError::NotFound)
    }

    /// Lista paginada das linhas cruas, cada uma com a variante etiquetada no
    /// side channel (ou null).
    pub async fn list_clients(
        &self,
        business_id: Uuid,
        query: ClientListQuery,
    ) -> Result<ClientList, AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let filter = ClientFilter {
            search: query.search,
            variant: query.variant,
            offset: (page - 1).saturating_mul(limit),
            limit,
        };
        let (records, total) = self.store.find_many(business_id, &filter).await?;

        let clients = records
            .into_iter()
            .map(|record| {
                let variant = SideChannelState::read(record.side_channel.as_deref()).variant_tag();
                ClientRow { record, variant }
            })
            .collect();

        Ok(ClientList {
            clients,
            pagination: Pagination {
                total,
                page,
                limit,
                total_pages: (total + limit - 1) / limit,
            },
        })
    }

    /// Exclusão lógica: o cliente fica inativo e sai da listagem.
    pub async fn delete_client(
        &self,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<ClientRecord, AppError> {
        self.store
            .deactivate(business_id, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Regrava a ordem manual. `ids` precisa conter exatamente os clientes
    /// ativos da empresa; a posição final de cada um é o seu índice na lista.
    pub async fn reorder(&self, business_id: Uuid, ids: &[Uuid]) -> Result<(), AppError> {
        let submitted: HashSet<Uuid> = ids.iter().copied().collect();
        if submitted.len() != ids.len() {
            return Err(AppError::ReorderMismatch);
        }

        let current: HashSet<Uuid> = self
            .store
            .active_ids(business_id)
            .await?
            .into_iter()
            .collect();
        if submitted != current {
            return Err(AppError::ReorderMismatch);
        }

        let positions: Vec<(Uuid, i32)> = ids
            .iter()
            .enumerate()
            .map(|(position, id)| (*id, position as i32))
            .collect();

        self.store.batch_update_positions(business_id, &positions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::{
        db::memory_store::MemoryClientStore,
        models::client::{ClientFilter, ClientStatus, IdentityField, Variant},
    };

    /// Store que perde a corrida pela posição nas primeiras `conflicts` escritas.
    struct RacingStore {
        inner: MemoryClientStore,
        conflicts: AtomicUsize,
    }

    impl RacingStore {
        fn new(conflicts: usize) -> Self {
            Self {
                inner: MemoryClientStore::new(),
                conflicts: AtomicUsize::new(conflicts),
            }
        }

        fn lose_race(&self) -> bool {
            self.conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        }
    }

    #[async_trait]
    impl ClientStore for RacingStore {
        async fn find_by_id(
            &self,
            business_id: Uuid,
            id: Uuid,
        ) -> Result<Option<ClientRecord>, AppError> {
            self.inner.find_by_id(business_id, id).await
        }

        async fn find_many(
            &self,
            business_id: Uuid,
            filter: &ClientFilter,
        ) -> Result<(Vec<ClientRecord>, i64), AppError> {
            self.inner.find_many(business_id, filter).await
        }

        async fn find_identity_owner(
            &self,
            business_id: Uuid,
            field: IdentityField,
            value: &str,
            exclude_id: Option<Uuid>,
        ) -> Result<Option<Uuid>, AppError> {
            self.inner
                .find_identity_owner(business_id, field, value, exclude_id)
                .await
        }

        async fn active_ids(&self, business_id: Uuid) -> Result<Vec<Uuid>, AppError> {
            self.inner.active_ids(business_id).await
        }

        async fn create(&self, new_client: &NewClient) -> Result<ClientRecord, AppError> {
            if self.lose_race() {
                return Err(AppError::PositionConflict);
            }
            self.inner.create(new_client).await
        }

        async fn update(
            &self,
            business_id: Uuid,
            id: Uuid,
            update: &ClientUpdate,
        ) -> Result<Option<ClientRecord>, AppError> {
            if self.lose_race() {
                return Err(AppError::PositionConflict);
            }
            self.inner.update(business_id, id, update).await
        }

        async fn deactivate(
            &self,
            business_id: Uuid,
            id: Uuid,
        ) -> Result<Option<ClientRecord>, AppError> {
            self.inner.deactivate(business_id, id).await
        }

        async fn batch_update_positions(
            &self,
            business_id: Uuid,
            positions: &[(Uuid, i32)],
        ) -> Result<(), AppError> {
            self.inner.batch_update_positions(business_id, positions).await
        }
    }

    fn payload(value: Value) -> ClientPayload {
        serde_json::from_value(value).unwrap()
    }

    fn company(name: &str, tax_id: &str) -> ClientPayload {
        payload(json!({
            "variant": "company",
            "displayName": name,
            "legalName": format!("{name} SL"),
            "taxId": tax_id
        }))
    }

    fn service() -> (ClientService, Arc<MemoryClientStore>) {
        let store = Arc::new(MemoryClientStore::new());
        (ClientService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn create_company_stores_identifier_and_side_channel() {
        let (service, store) = service();
        let business = Uuid::new_v4();

        let view = service
            .create_client(business, None, company("Acme", "B123"))
            .await
            .unwrap();

        match &view {
            VariantView::Company(company) => {
                assert_eq!(company.tax_id.as_deref(), Some("B123"));
                assert_eq!(company.legal_name.as_deref(), Some("Acme SL"));
            }
            other => panic!("expected company view, got {:?}", other),
        }

        let stored = &store.all(business).await[0];
        assert_eq!(stored.legal_identifier.as_deref(), Some("B123"));
        assert_eq!(stored.status, ClientStatus::Active);
        let side: Value = serde_json::from_str(stored.side_channel.as_deref().unwrap()).unwrap();
        assert_eq!(side["variant"], "company");
        assert_eq!(side["legalName"], "Acme SL");
    }

    #[tokio::test]
    async fn legal_identifier_is_unique_per_business_only() {
        let (service, _) = service();
        let business = Uuid::new_v4();

        service
            .create_client(business, None, company("Acme", "B123"))
            .await
            .unwrap();
        let err = service
            .create_client(business, None, company("Acme Dos", "B123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UniquenessConflict(IdentityField::LegalIdentifier)));

        service
            .create_client(Uuid::new_v4(), None, company("Acme", "B123"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn vat_conflict_is_reported_on_vat_field() {
        let (service, _) = service();
        let business = Uuid::new_v4();

        let mut first = company("Acme", "B1");
        first.vat_id = Some("ESB1".into());
        service.create_client(business, None, first).await.unwrap();

        let mut second = company("Beta", "B2");
        second.vat_id = Some("esb1".into());
        let err = service.create_client(business, None, second).await.unwrap_err();
        assert_eq!(err.field(), Some("vatId"));
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_before_writing() {
        let (service, store) = service();
        let business = Uuid::new_v4();

        let err = service
            .create_client(business, None, payload(json!({ "variant": "company" })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert!(store.all(business).await.is_empty());
    }

    #[tokio::test]
    async fn update_keeps_own_identifier_and_rewrites_fields() {
        let (service, _) = service();
        let business = Uuid::new_v4();

        let created = service
            .create_client(business, None, company("Acme", "B123"))
            .await
            .unwrap();
        let id = created.common().id;

        let mut changed = company("Acme Renamed", "B123");
        changed.notes = Some("VIP".into());
        let updated = service.update_client(business, id, changed).await.unwrap();

        assert_eq!(updated.common().display_name, "Acme Renamed");
        assert_eq!(updated.common().notes.as_deref(), Some("VIP"));
    }

    #[tokio::test]
    async fn other_business_sees_not_found() {
        let (service, _) = service();
        let business = Uuid::new_v4();
        let id = service
            .create_client(business, None, company("Acme", "B123"))
            .await
            .unwrap()
            .common()
            .id;

        let other = Uuid::new_v4();
        assert!(matches!(
            service.get_client(other, id).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            service.update_client(other, id, company("X", "B9")).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            service.delete_client(other, id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_is_logical_and_hides_from_list() {
        let (service, store) = service();
        let business = Uuid::new_v4();
        let id = service
            .create_client(business, None, company("Acme", "B123"))
            .await
            .unwrap()
            .common()
            .id;

        let deleted = service.delete_client(business, id).await.unwrap();
        assert_eq!(deleted.status, ClientStatus::Inactive);
        assert!(deleted.deactivated_at.is_some());
        assert_eq!(store.all(business).await.len(), 1);

        let list = service
            .list_clients(business, ClientListQuery {
                page: None,
                limit: None,
                search: None,
                variant: None,
            })
            .await
            .unwrap();
        assert_eq!(list.pagination.total, 0);

        // Continua legível pelo id
        assert_eq!(
            service.get_client(business, id).await.unwrap().common().status,
            ClientStatus::Inactive
        );
    }

    #[tokio::test]
    async fn reactivation_moves_client_to_the_end() {
        let (service, _) = service();
        let business = Uuid::new_v4();
        let first = service
            .create_client(business, None, company("Acme", "B1"))
            .await
            .unwrap()
            .common()
            .id;
        service
            .create_client(business, None, company("Beta", "B2"))
            .await
            .unwrap();

        service.delete_client(business, first).await.unwrap();

        let mut reactivate = company("Acme", "B1");
        reactivate.status = Some(ClientStatus::Active);
        let view = service.update_client(business, first, reactivate).await.unwrap();

        assert_eq!(view.common().status, ClientStatus::Active);
        assert_eq!(view.common().deactivated_at, None);
        assert_eq!(view.common().sort_position, 2);
    }

    #[tokio::test]
    async fn reorder_rewrites_positions_densely() {
        let (service, store) = service();
        let business = Uuid::new_v4();
        let mut ids = Vec::new();
        for (name, tax) in [("A", "B1"), ("B", "B2"), ("C", "B3")] {
            let view = service
                .create_client(business, None, company(name, tax))
                .await
                .unwrap();
            ids.push(view.common().id);
        }

        let positions: Vec<i32> = store.all(business).await.iter().map(|r| r.sort_position).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        let new_order = vec![ids[2], ids[0], ids[1]];
        service.reorder(business, &new_order).await.unwrap();

        let stored = store.all(business).await;
        let order: Vec<Uuid> = stored.iter().map(|r| r.id).collect();
        let positions: Vec<i32> = stored.iter().map(|r| r.sort_position).collect();
        assert_eq!(order, new_order);
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn reorder_with_foreign_id_changes_nothing() {
        let (service, store) = service();
        let business = Uuid::new_v4();
        let other_business = Uuid::new_v4();

        let a = service
            .create_client(business, None, company("A", "B1"))
            .await
            .unwrap()
            .common()
            .id;
        let b = service
            .create_client(business, None, company("B", "B2"))
            .await
            .unwrap()
            .common()
            .id;
        let foreign = service
            .create_client(other_business, None, company("F", "B1"))
            .await
            .unwrap()
            .common()
            .id;

        let before = store.all(business).await;

        let err = service.reorder(business, &[b, foreign]).await.unwrap_err();
        assert!(matches!(err, AppError::ReorderMismatch));

        // Lista incompleta e ids repetidos também são rejeitados
        assert!(matches!(
            service.reorder(business, &[b]).await,
            Err(AppError::ReorderMismatch)
        ));
        assert!(matches!(
            service.reorder(business, &[b, a, a]).await,
            Err(AppError::ReorderMismatch)
        ));

        assert_eq!(store.all(business).await, before);
    }

    #[tokio::test]
    async fn list_filters_paginates_and_annotates_variant() {
        let (service, store) = service();
        let business = Uuid::new_v4();

        service
            .create_client(business, None, company("Acme", "B1"))
            .await
            .unwrap();
        service
            .create_client(
                business,
                None,
                payload(json!({
                    "variant": "individual",
                    "givenName": "Maria",
                    "surname": "Lopez",
                    "nationalId": "123Z"
                })),
            )
            .await
            .unwrap();
        service
            .create_client(business, None, payload(json!({ "displayName": "Legacy" })))
            .await
            .unwrap();

        let mut legacy = crate::services::variant_resolver::tests::record_with(Some(
            r#"{"tipoCliente":"particular","apellidos":"Ruiz"}"#,
        ));
        legacy.business_id = business;
        legacy.display_name = "Pedro Ruiz".into();
        legacy.sort_position = 3;
        store.insert_raw(legacy).await;

        let query = |search: Option<&str>, variant: Option<Variant>, limit: Option<i64>| {
            ClientListQuery {
                page: None,
                limit,
                search: search.map(str::to_string),
                variant,
            }
        };

        let all = service.list_clients(business, query(None, None, None)).await.unwrap();
        assert_eq!(all.pagination.total, 4);
        let variants: Vec<Option<Variant>> = all.clients.iter().map(|c| c.variant).collect();
        assert_eq!(
            variants,
            vec![
                Some(Variant::Company),
                Some(Variant::Individual),
                None,
                Some(Variant::Individual)
            ]
        );

        let individuals = service
            .list_clients(business, query(None, Some(Variant::Individual), None))
            .await
            .unwrap();
        assert_eq!(individuals.pagination.total, 2);

        let found = service
            .list_clients(business, query(Some("maria"), None, None))
            .await
            .unwrap();
        assert_eq!(found.clients.len(), 1);
        assert_eq!(found.clients[0].record.display_name, "Maria Lopez");

        let paged = service
            .list_clients(business, query(None, None, Some(3)))
            .await
            .unwrap();
        assert_eq!(paged.clients.len(), 3);
        assert_eq!(paged.pagination.total_pages, 2);

        let clamped = service
            .list_clients(business, query(None, None, Some(1000)))
            .await
            .unwrap();
        assert_eq!(clamped.pagination.limit, MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn huge_page_returns_empty_list_instead_of_overflowing() {
        let (service, _) = service();
        let business = Uuid::new_v4();
        service
            .create_client(business, None, company("Acme", "B1"))
            .await
            .unwrap();

        let list = service
            .list_clients(business, ClientListQuery {
                page: Some(i64::MAX),
                limit: Some(10),
                search: None,
                variant: None,
            })
            .await
            .unwrap();

        assert!(list.clients.is_empty());
        assert_eq!(list.pagination.total, 1);
        assert_eq!(list.pagination.page, i64::MAX);
    }

    #[tokio::test]
    async fn create_retries_once_after_losing_position_race() {
        let store = Arc::new(RacingStore::new(1));
        let service = ClientService::new(store.clone());
        let business = Uuid::new_v4();

        let view = service
            .create_client(business, None, company("Acme", "B1"))
            .await
            .unwrap();
        assert_eq!(view.common().sort_position, 0);
        assert_eq!(store.inner.all(business).await.len(), 1);
    }

    #[tokio::test]
    async fn second_position_conflict_is_reported_as_conflict() {
        let store = Arc::new(RacingStore::new(2));
        let service = ClientService::new(store.clone());
        let business = Uuid::new_v4();

        let err = service
            .create_client(business, None, company("Acme", "B1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PositionConflict));
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
        assert!(store.inner.all(business).await.is_empty());
    }

    #[tokio::test]
    async fn reactivation_retries_once_after_losing_position_race() {
        let store = Arc::new(RacingStore::new(0));
        let service = ClientService::new(store.clone());
        let business = Uuid::new_v4();

        let id = service
            .create_client(business, None, company("Acme", "B1"))
            .await
            .unwrap()
            .common()
            .id;
        service.delete_client(business, id).await.unwrap();

        store.conflicts.store(1, Ordering::SeqCst);
        let mut reactivate = company("Acme", "B1");
        reactivate.status = Some(ClientStatus::Active);
        let view = service.update_client(business, id, reactivate).await.unwrap();
        assert_eq!(view.common().status, ClientStatus::Active);
    }
}
