pub mod client_repo;
pub use client_repo::PgClientRepository;
pub mod business_repo;
pub use business_repo::BusinessRepository;
pub mod table_config_repo;
pub use table_config_repo::TableConfigRepository;

#[cfg(test)]
pub mod memory_store;
