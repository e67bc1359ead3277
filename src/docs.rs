// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Clients ---
        handlers::clients::list_clients,
        handlers::clients::create_client,
        handlers::clients::get_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,
        handlers::clients::reorder_clients,

        // --- Business ---
        handlers::business::get_my_business,
        handlers::business::check_business,
        handlers::business::create_business,

        // --- Table config ---
        handlers::table_config::get_table_config,
        handlers::table_config::save_table_config,
    ),
    components(
        schemas(
            // --- Clients ---
            models::client::Variant,
            models::client::ClientStatus,
            models::client::IdentityField,
            models::client::Address,
            models::client::ClientRecord,
            models::client::ClientRow,
            models::client::ClientList,
            models::client::Pagination,
            models::client::ClientCommon,
            models::client::CompanyView,
            models::client::IndividualView,
            models::client::VariantView,
            models::client::ClientPayload,
            models::client::ReorderPayload,
            handlers::clients::DeleteClientResponse,
            handlers::clients::MessageResponse,

            // --- Business ---
            models::business::Business,
            models::business::BusinessSummary,
            models::business::BusinessResponse,
            models::business::BusinessCheckResponse,
            models::business::CreateBusinessPayload,

            // --- Table config ---
            models::table_config::TableConfig,
            models::table_config::TableConfigResponse,
            models::table_config::SaveTableConfigPayload,
        )
    ),
    tags(
        (name = "Clients", description = "Clientes (empresas e particulares)"),
        (name = "Business", description = "Empresa do usuário e assistente de configuração"),
        (name = "Table config", description = "Preferências de tabela por usuário")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
