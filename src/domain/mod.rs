pub mod audit;
pub mod backup;
pub mod error;
pub mod llm_config;
pub mod query;
pub mod schema;
pub mod session;
