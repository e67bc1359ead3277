pub mod auth;
pub mod business;
pub mod client;
pub mod side_channel;
pub mod table_config;
