pub mod audit_service;
pub mod backup_service;
pub mod column_suggester;
pub mod nl_to_sql;
pub mod query_normalizer;
pub mod sql_extractor;
pub mod sql_gateway;
pub mod statement_allowlist;
