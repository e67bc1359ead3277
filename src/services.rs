pub mod business_service;
pub mod client_service;
pub mod identity_guard;
pub mod projection;
pub mod variant_resolver;
