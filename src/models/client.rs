// src/models/client.rs

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

// --- ENUMS ---

/// As duas formas lógicas de um cliente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Company,
    Individual,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Company => "company",
            Variant::Individual => "individual",
        }
    }

    /// Lê a etiqueta gravada no side channel. Aceita também as etiquetas
    /// dos registros antigos ("empresa" / "particular").
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "company" | "empresa" => Some(Variant::Company),
            "individual" | "particular" => Some(Variant::Individual),
            _ => None,
        }
    }
}

// Mapeia o CREATE TYPE client_status do banco
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "client_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
}

/// Os dois campos de identidade que precisam ser únicos dentro de uma empresa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum IdentityField {
    LegalIdentifier,
    VatId,
}

impl IdentityField {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityField::LegalIdentifier => "legalIdentifier",
            IdentityField::VatId => "vatId",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            IdentityField::LegalIdentifier => "legal_identifier",
            IdentityField::VatId => "vat_id",
        }
    }
}

pub const DEFAULT_CATEGORY: &str = "client";

// --- ENDEREÇO ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[schema(example = "Calle Mayor 1")]
    pub street: Option<String>,
    #[schema(example = "Madrid")]
    pub city: Option<String>,
    #[schema(example = "28013")]
    pub postal_code: Option<String>,
    pub province: Option<String>,
    #[schema(example = "ES")]
    pub country: Option<String>,
}

impl Address {
    /// Remove espaços e strings vazias; `None` quando não sobra nenhum campo.
    pub fn normalized(&self) -> Option<Address> {
        let address = Address {
            street: clean(self.street.as_deref()),
            city: clean(self.city.as_deref()),
            postal_code: clean(self.postal_code.as_deref()),
            province: clean(self.province.as_deref()),
            country: clean(self.country.as_deref()),
        };
        (!address.is_blank()).then_some(address)
    }

    pub fn is_blank(&self) -> bool {
        [
            &self.street,
            &self.city,
            &self.postal_code,
            &self.province,
            &self.country,
        ]
        .iter()
        .all(|part| part.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

/// Normaliza um texto de formulário: sem espaços nas pontas, vazio vira `None`.
pub fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(clean(value.as_deref()))
}

// --- CLIENTE (a linha gravada) ---

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: Uuid,
    pub business_id: Uuid,
    pub owner_user_id: Option<Uuid>,

    pub display_name: String,
    pub trade_name: Option<String>,

    // CIF da empresa OU DNI do particular
    pub legal_identifier: Option<String>,
    pub vat_id: Option<String>,

    // Endereço comercial (colunas usadas na listagem e na busca)
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    pub country: Option<String>,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub website: Option<String>,

    pub status: ClientStatus,
    pub category: String,
    pub notes: Option<String>,
    pub contact_person: Option<String>,
    pub language: Option<String>,
    pub currency: Option<String>,

    #[schema(value_type = Option<String>, format = Date)]
    pub registration_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,

    pub sort_position: i32,

    // JSON com os campos específicos de cada variante
    pub side_channel: Option<String>,
}

impl ClientRecord {
    pub fn commercial_address(&self) -> Option<Address> {
        Address {
            street: self.street.clone(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
            province: self.province.clone(),
            country: self.country.clone(),
        }
        .normalized()
    }
}

/// Colunas base gravadas em toda criação/atualização.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientColumns {
    pub display_name: String,
    pub trade_name: Option<String>,
    pub legal_identifier: Option<String>,
    pub vat_id: Option<String>,
    pub commercial_address: Option<Address>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub website: Option<String>,
    pub category: String,
    pub notes: Option<String>,
    pub contact_person: Option<String>,
    pub language: Option<String>,
    pub currency: Option<String>,
    pub registration_date: Option<NaiveDate>,
    pub birth_date: Option<NaiveDate>,
}

impl ClientColumns {
    pub fn identity(&self, field: IdentityField) -> Option<&str> {
        match field {
            IdentityField::LegalIdentifier => self.legal_identifier.as_deref(),
            IdentityField::VatId => self.vat_id.as_deref(),
        }
    }
}

/// Resultado da compressão: colunas base + side channel serializado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedClient {
    pub columns: ClientColumns,
    pub side_channel: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub business_id: Uuid,
    pub owner_user_id: Option<Uuid>,
    pub client: CompressedClient,
}

#[derive(Debug, Clone)]
pub struct ClientUpdate {
    pub client: CompressedClient,
    // `None` mantém o status atual
    pub status: Option<ClientStatus>,
}

// --- VISÃO EXPANDIDA (leitura / edição) ---

/// Campos comuns às duas variantes, já com o side channel aplicado por cima.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientCommon {
    pub id: Uuid,
    pub owner_user_id: Option<Uuid>,
    pub display_name: String,
    pub trade_name: Option<String>,
    pub legal_identifier: Option<String>,
    pub vat_id: Option<String>,
    pub commercial_address: Option<Address>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub website: Option<String>,
    pub status: ClientStatus,
    pub category: String,
    pub notes: Option<String>,
    pub contact_person: Option<String>,
    pub language: Option<String>,
    pub currency: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub registration_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub birth_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub sort_position: i32,

    // Chaves do side channel sem campo próprio
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: BTreeMap<String, Value>,
}

impl From<&ClientRecord> for ClientCommon {
    fn from(record: &ClientRecord) -> Self {
        Self {
            id: record.id,
            owner_user_id: record.owner_user_id,
            display_name: record.display_name.clone(),
            trade_name: record.trade_name.clone(),
            legal_identifier: record.legal_identifier.clone(),
            vat_id: record.vat_id.clone(),
            commercial_address: record.commercial_address(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            mobile: record.mobile.clone(),
            website: record.website.clone(),
            status: record.status,
            category: record.category.clone(),
            notes: record.notes.clone(),
            contact_person: record.contact_person.clone(),
            language: record.language.clone(),
            currency: record.currency.clone(),
            registration_date: record.registration_date,
            birth_date: record.birth_date,
            created_at: record.created_at,
            deactivated_at: record.deactivated_at,
            sort_position: record.sort_position,
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyView {
    #[serde(flatten)]
    pub common: ClientCommon,
    #[schema(example = "B12345678")]
    pub tax_id: Option<String>,
    #[schema(example = "Acme Soluciones SL")]
    pub legal_name: Option<String>,
    pub fiscal_address: Option<Address>,
    // true quando o endereço comercial foi informado e difere do fiscal
    pub separate_commercial_address: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IndividualView {
    #[serde(flatten)]
    pub common: ClientCommon,
    #[schema(example = "12345678Z")]
    pub national_id: Option<String>,
    #[schema(example = "Maria")]
    pub given_name: String,
    #[schema(example = "Lopez Garcia")]
    pub surname: Option<String>,
}

/// O cliente como o formulário e a tela de detalhe o enxergam.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum VariantView {
    Company(CompanyView),
    Individual(IndividualView),
}

impl VariantView {
    pub fn variant(&self) -> Variant {
        match self {
            VariantView::Company(_) => Variant::Company,
            VariantView::Individual(_) => Variant::Individual,
        }
    }

    pub fn common(&self) -> &ClientCommon {
        match self {
            VariantView::Company(view) => &view.common,
            VariantView::Individual(view) => &view.common,
        }
    }
}

// --- ENTRADA (criação / atualização) ---

/// Campos compartilhados de qualquer escrita.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedInput {
    pub display_name: Option<String>,
    pub trade_name: Option<String>,
    pub vat_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub website: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
    pub contact_person: Option<String>,
    pub language: Option<String>,
    pub currency: Option<String>,
    pub registration_date: Option<NaiveDate>,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyInput {
    pub shared: SharedInput,
    pub tax_id: Option<String>,
    pub legal_name: Option<String>,
    pub fiscal_address: Option<Address>,
    pub commercial_address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndividualInput {
    pub shared: SharedInput,
    pub national_id: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub address: Option<Address>,
}

/// Escrita sem variante (compatibilidade com clientes antigos).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UntaggedInput {
    pub shared: SharedInput,
    pub legal_identifier: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariantInput {
    Company(CompanyInput),
    Individual(IndividualInput),
    Untagged(UntaggedInput),
}

/// Payload plano enviado pelo formulário de clientes.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    pub variant: Option<Variant>,

    #[validate(length(max = 200, message = "too_long"))]
    #[schema(example = "Acme")]
    pub display_name: Option<String>,
    pub trade_name: Option<String>,

    // Só usado em escritas sem variante
    pub legal_identifier: Option<String>,
    #[validate(length(max = 50, message = "too_long"))]
    pub vat_id: Option<String>,
    pub address: Option<Address>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "contacto@acme.es")]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub website: Option<String>,

    pub status: Option<ClientStatus>,
    #[schema(example = "client")]
    pub category: Option<String>,
    pub notes: Option<String>,
    pub contact_person: Option<String>,
    #[validate(length(max = 10, message = "too_long"))]
    pub language: Option<String>,
    #[validate(length(max = 3, message = "too_long"))]
    pub currency: Option<String>,

    #[schema(value_type = Option<String>, format = Date, example = "2024-01-15")]
    pub registration_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date, example = "1990-05-20")]
    pub birth_date: Option<NaiveDate>,

    // Empresa
    #[validate(length(max = 50, message = "too_long"))]
    #[schema(example = "B12345678")]
    pub tax_id: Option<String>,
    pub legal_name: Option<String>,
    pub fiscal_address: Option<Address>,
    pub commercial_address: Option<Address>,

    // Particular
    #[validate(length(max = 50, message = "too_long"))]
    pub national_id: Option<String>,
    pub given_name: Option<String>,
    pub surname: Option<String>,
}

impl ClientPayload {
    /// Validação do derive mais as regras que dependem da variante.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        let has_display_name = clean(self.display_name.as_deref()).is_some();
        match self.variant {
            Some(Variant::Individual) => {
                if clean(self.given_name.as_deref()).is_none() && !has_display_name {
                    errors.add("given_name", required());
                }
            }
            _ => {
                if !has_display_name {
                    errors.add("display_name", required());
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Separa o payload plano na entrada tipada da variante.
    pub fn into_input(self) -> VariantInput {
        let shared = SharedInput {
            display_name: self.display_name,
            trade_name: self.trade_name,
            vat_id: self.vat_id,
            email: self.email,
            phone: self.phone,
            mobile: self.mobile,
            website: self.website,
            category: self.category,
            notes: self.notes,
            contact_person: self.contact_person,
            language: self.language,
            currency: self.currency,
            registration_date: self.registration_date,
            birth_date: self.birth_date,
        };

        match self.variant {
            Some(Variant::Company) => VariantInput::Company(CompanyInput {
                shared,
                tax_id: self.tax_id,
                legal_name: self.legal_name,
                fiscal_address: self.fiscal_address,
                commercial_address: self.commercial_address,
            }),
            Some(Variant::Individual) => VariantInput::Individual(IndividualInput {
                shared,
                national_id: self.national_id,
                given_name: self.given_name,
                surname: self.surname,
                address: self.address,
            }),
            None => VariantInput::Untagged(UntaggedInput {
                shared,
                legal_identifier: self.legal_identifier,
                address: self.address,
            }),
        }
    }
}

pub(crate) fn required() -> ValidationError {
    let mut err = ValidationError::new("required");
    err.message = Some("required".into());
    err
}

// --- LISTAGEM ---

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClientListQuery {
    #[param(example = 1)]
    pub page: Option<i64>,
    #[param(example = 10)]
    pub limit: Option<i64>,
    pub search: Option<String>,
    #[param(inline)]
    pub variant: Option<Variant>,
}

/// Filtro já resolvido que o repositório aplica.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientFilter {
    pub search: Option<String>,
    pub variant: Option<Variant>,
    pub offset: i64,
    pub limit: i64,
}

/// Linha crua da tabela + a variante lida do side channel (ou null).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientRow {
    #[serde(flatten)]
    pub record: ClientRecord,
    pub variant: Option<Variant>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientList {
    pub clients: Vec<ClientRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPayload {
    pub ids: Vec<Uuid>,
}
