// src/db/client_repo.rs

use async_trait::async_trait;
use sqlx::{
    postgres::PgArguments,
    query::QueryAs,
    PgPool, Postgres,
};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_write_error, error::AppError},
    models::client::{
        ClientColumns, ClientFilter, ClientRecord, ClientUpdate, IdentityField, NewClient, Variant,
    },
};

/// O colaborador de persistência dos clientes. Toda operação é filtrada pela
/// empresa (tenant) do chamador.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn find_by_id(&self, business_id: Uuid, id: Uuid)
        -> Result<Option<ClientRecord>, AppError>;

    /// Página de clientes ativos e o total que casa com o filtro.
    async fn find_many(
        &self,
        business_id: Uuid,
        filter: &ClientFilter,
    ) -> Result<(Vec<ClientRecord>, i64), AppError>;

    /// Outro cliente da empresa que já usa `value` no campo (sem diferenciar maiúsculas).
    async fn find_identity_owner(
        &self,
        business_id: Uuid,
        field: IdentityField,
        value: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError>;

    async fn active_ids(&self, business_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Insere com `status = active` e `sort_position = max + 1` da empresa.
    async fn create(&self, new_client: &NewClient) -> Result<ClientRecord, AppError>;

    async fn update(
        &self,
        business_id: Uuid,
        id: Uuid,
        update: &ClientUpdate,
    ) -> Result<Option<ClientRecord>, AppError>;

    async fn deactivate(&self, business_id: Uuid, id: Uuid)
        -> Result<Option<ClientRecord>, AppError>;

    /// Regrava as posições em lote: ou todas mudam, ou nenhuma.
    async fn batch_update_positions(
        &self,
        business_id: Uuid,
        positions: &[(Uuid, i32)],
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Filtro comum da listagem e da contagem ($1 empresa, $2 busca, $3/$4 variante)
const LIST_FILTER: &str = r#"
    WHERE business_id = $1
      AND status = 'active'
      AND (
        $2::text IS NULL
        OR display_name ILIKE $2
        OR trade_name ILIKE $2
        OR legal_identifier ILIKE $2
        OR vat_id ILIKE $2
        OR email ILIKE $2
        OR phone ILIKE $2
        OR mobile ILIKE $2
        OR city ILIKE $2
        OR province ILIKE $2
        OR side_channel ILIKE $2
      )
      AND (
        $3::text IS NULL
        OR side_channel ILIKE $3
        OR side_channel ILIKE $4
      )
"#;

pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    let search = search.map(str::trim).filter(|s| !s.is_empty())?;
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{}%", escaped))
}

// Padrões que casam com a etiqueta gravada pelo formulário atual e pelo antigo
pub(crate) fn variant_patterns(variant: Option<Variant>) -> (Option<String>, Option<String>) {
    match variant {
        None => (None, None),
        Some(variant) => {
            let legacy = match variant {
                Variant::Company => "empresa",
                Variant::Individual => "particular",
            };
            (
                Some(format!("%\"variant\":\"{}\"%", variant.as_str())),
                Some(format!("%\"tipoCliente\":\"{}\"%", legacy)),
            )
        }
    }
}

// Liga as 20 colunas base, na ordem usada pelos INSERT/UPDATE abaixo
fn bind_columns<'q>(
    query: QueryAs<'q, Postgres, ClientRecord, PgArguments>,
    columns: &'q ClientColumns,
) -> QueryAs<'q, Postgres, ClientRecord, PgArguments> {
    let address = columns.commercial_address.as_ref();
    query
        .bind(columns.display_name.as_str())
        .bind(columns.trade_name.as_deref())
        .bind(columns.legal_identifier.as_deref())
        .bind(columns.vat_id.as_deref())
        .bind(address.and_then(|a| a.street.as_deref()))
        .bind(address.and_then(|a| a.city.as_deref()))
        .bind(address.and_then(|a| a.postal_code.as_deref()))
        .bind(address.and_then(|a| a.province.as_deref()))
        .bind(address.and_then(|a| a.country.as_deref()))
        .bind(columns.email.as_deref())
        .bind(columns.phone.as_deref())
        .bind(columns.mobile.as_deref())
        .bind(columns.website.as_deref())
        .bind(columns.category.as_str())
        .bind(columns.notes.as_deref())
        .bind(columns.contact_person.as_deref())
        .bind(columns.language.as_deref())
        .bind(columns.currency.as_deref())
        .bind(columns.registration_date)
        .bind(columns.birth_date)
}

#[async_trait]
impl ClientStore for PgClientRepository {
    async fn find_by_id(
        &self,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ClientRecord>, AppError> {
        let client = sqlx::query_as::<_, ClientRecord>(
            "SELECT * FROM clients WHERE business_id = $1 AND id = $2",
        )
        .bind(business_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    async fn find_many(
        &self,
        business_id: Uuid,
        filter: &ClientFilter,
    ) -> Result<(Vec<ClientRecord>, i64), AppError> {
        let search = like_pattern(filter.search.as_deref());
        let (variant, legacy_variant) = variant_patterns(filter.variant);

        let list_sql = format!(
            "SELECT * FROM clients {} ORDER BY sort_position ASC, display_name ASC LIMIT $5 OFFSET $6",
            LIST_FILTER
        );
        let clients = sqlx::query_as::<_, ClientRecord>(&list_sql)
            .bind(business_id)
            .bind(search.as_deref())
            .bind(variant.as_deref())
            .bind(legacy_variant.as_deref())
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) FROM clients {}", LIST_FILTER);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(business_id)
            .bind(search.as_deref())
            .bind(variant.as_deref())
            .bind(legacy_variant.as_deref())
            .fetch_one(&self.pool)
            .await?;

        Ok((clients, total))
    }

    async fn find_identity_owner(
        &self,
        business_id: Uuid,
        field: IdentityField,
        value: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        // O nome da coluna vem de um enum fechado, nunca do usuário
        let sql = format!(
            r#"
            SELECT id FROM clients
            WHERE business_id = $1
              AND LOWER({column}) = LOWER($2)
              AND ($3::uuid IS NULL OR id <> $3)
            LIMIT 1
            "#,
            column = field.column()
        );

        let owner = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(business_id)
            .bind(value)
            .bind(exclude_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }

    async fn active_ids(&self, business_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM clients WHERE business_id = $1 AND status = 'active'",
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn create(&self, new_client: &NewClient) -> Result<ClientRecord, AppError> {
        let query = sqlx::query_as::<_, ClientRecord>(
            r#"
            INSERT INTO clients (
                business_id, owner_user_id,
                display_name, trade_name, legal_identifier, vat_id,
                street, city, postal_code, province, country,
                email, phone, mobile, website,
                category, notes, contact_person, language, currency,
                registration_date, birth_date,
                side_channel, status, sort_position
            )
            VALUES (
                $1, $2,
                $3, $4, $5, $6,
                $7, $8, $9, $10, $11,
                $12, $13, $14, $15,
                $16, $17, $18, $19, $20,
                $21, $22,
                $23, 'active',
                (SELECT COALESCE(MAX(sort_position), -1) + 1 FROM clients WHERE business_id = $1)
            )
            RETURNING *
            "#,
        )
        .bind(new_client.business_id)
        .bind(new_client.owner_user_id);

        bind_columns(query, &new_client.client.columns)
            .bind(new_client.client.side_channel.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn update(
        &self,
        business_id: Uuid,
        id: Uuid,
        update: &ClientUpdate,
    ) -> Result<Option<ClientRecord>, AppError> {
        // Reativar um cliente devolve ele ao fim da lista
        let query = sqlx::query_as::<_, ClientRecord>(
            r#"
            UPDATE clients SET
                display_name = $3, trade_name = $4, legal_identifier = $5, vat_id = $6,
                street = $7, city = $8, postal_code = $9, province = $10, country = $11,
                email = $12, phone = $13, mobile = $14, website = $15,
                category = $16, notes = $17, contact_person = $18, language = $19, currency = $20,
                registration_date = $21, birth_date = $22,
                side_channel = $23,
                status = COALESCE($24::client_status, status),
                deactivated_at = CASE
                    WHEN $24::client_status IS NULL OR $24::client_status = status THEN deactivated_at
                    WHEN $24::client_status = 'inactive' THEN NOW()
                    ELSE NULL
                END,
                sort_position = CASE
                    WHEN $24::client_status = 'active' AND status = 'inactive' THEN (
                        SELECT COALESCE(MAX(c.sort_position), -1) + 1
                        FROM clients c
                        WHERE c.business_id = $1
                    )
                    ELSE sort_position
                END,
                updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(id);

        bind_columns(query, &update.client.columns)
            .bind(update.client.side_channel.as_deref())
            .bind(update.status)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn deactivate(
        &self,
        business_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ClientRecord>, AppError> {
        let client = sqlx::query_as::<_, ClientRecord>(
            r#"
            UPDATE clients
            SET status = 'inactive', deactivated_at = NOW(), updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(business_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    async fn batch_update_positions(
        &self,
        business_id: Uuid,
        positions: &[(Uuid, i32)],
    ) -> Result<(), AppError> {
        let (ids, slots): (Vec<Uuid>, Vec<i32>) = positions.iter().copied().unzip();

        let mut tx = self.pool.begin().await?;

        // Fase 1: estaciona as linhas em posições negativas para não colidir
        // com o índice único enquanto a nova ordem é gravada.
        let parked = sqlx::query(
            r#"
            UPDATE clients c
            SET sort_position = -1 - t.position
            FROM UNNEST($2::uuid[], $3::int4[]) AS t(id, position)
            WHERE c.id = t.id AND c.business_id = $1 AND c.status = 'active'
            "#,
        )
        .bind(business_id)
        .bind(&ids[..])
        .bind(&slots[..])
        .execute(&mut *tx)
        .await?;

        if parked.rows_affected() != positions.len() as u64 {
            // O drop de `tx` faz o rollback
            return Err(AppError::ReorderMismatch);
        }

        // Fase 2: posições finais 0..N-1
        sqlx::query(
            r#"
            UPDATE clients c
            SET sort_position = t.position, updated_at = NOW()
            FROM UNNEST($2::uuid[], $3::int4[]) AS t(id, position)
            WHERE c.id = t.id AND c.business_id = $1
            "#,
        )
        .bind(business_id)
        .bind(&ids[..])
        .bind(&slots[..])
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
