pub mod business;
pub mod clients;
pub mod table_config;
