use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::application::use_cases::audit_service::AuditService;
use crate::application::use_cases::backup_service::BackupService;
use crate::application::use_cases::nl_to_sql::NlToSqlTranslator;
use crate::application::use_cases::sql_gateway::SqlGateway;
use crate::domain::error::Result;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::db::schema::SchemaIntrospector;
use crate::infrastructure::db::sqlite::SqliteStore;
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};
use crate::interfaces::http::HttpState;

/// Every component, wired from one [`AppConfig`].
pub struct Services {
    pub translator: Arc<NlToSqlTranslator>,
    pub gateway: SqlGateway,
    pub introspector: SchemaIntrospector,
    pub audit: AuditService,
    pub backups: BackupService,
}

impl Services {
    pub async fn build(config: &AppConfig) -> Result<Self> {
        Self::with_llm_client(config, Arc::new(RouterClient::new())).await
    }

    pub async fn with_llm_client(
        config: &AppConfig,
        llm_client: Arc<dyn LLMClient + Send + Sync>,
    ) -> Result<Self> {
        if !config.database.path.exists() {
            warn!(
                path = %config.database.path.display(),
                "Database file not found, an empty store will be created"
            );
        }

        let store = SqliteStore::new(&config.database.path);
        let audit = AuditService::new(store.clone());
        audit.ensure_table().await?;

        let introspector = SchemaIntrospector::new(store.clone());
        let gateway = SqlGateway::new(store, audit.clone());
        let translator = NlToSqlTranslator::new(
            llm_client,
            config.llm.clone(),
            gateway.clone(),
            introspector.clone(),
        );
        let backups = BackupService::new(&config.database.path, config.backup.clone());

        info!(
            database = %config.database.path.display(),
            backups = %config.backup.dir.display(),
            provider = ?config.llm.provider,
            model = %config.llm.model,
            "Services ready"
        );

        Ok(Self {
            translator: Arc::new(translator),
            gateway,
            introspector,
            audit,
            backups,
        })
    }

    pub fn into_http_state(self) -> HttpState {
        HttpState {
            translator: self.translator,
            gateway: self.gateway,
            introspector: self.introspector,
            audit: self.audit,
            backups: self.backups,
            logs: Arc::new(Mutex::new(Vec::new())),
        }
    }
}
