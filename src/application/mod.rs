pub mod use_cases;

pub use use_cases::nl_to_sql::NlToSqlTranslator;
pub use use_cases::sql_gateway::SqlGateway;
