use crate::application::use_cases::audit_service::AuditService;
use crate::application::use_cases::backup_service::BackupService;
use crate::application::use_cases::nl_to_sql::NlToSqlTranslator;
use crate::application::use_cases::query_normalizer::preprocess_question;
use crate::application::use_cases::sql_gateway::SqlGateway;
use crate::domain::query::{ExecutionResult, Translation};
use crate::domain::session::SessionContext;
use crate::infrastructure::config::ServerConfig;
use crate::infrastructure::db::schema::SchemaIntrospector;
use actix_cors::Cors;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 100;
const DEFAULT_AUDIT_LIMIT: i64 = 50;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub translator: Arc<NlToSqlTranslator>,
    pub gateway: SqlGateway,
    pub introspector: SchemaIntrospector,
    pub audit: AuditService,
    pub backups: BackupService,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Deserialize)]
pub struct ExecuteRequest {
    pub sql: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct RestoreRequest {
    /// Snapshot name as listed by `GET /backups`.
    pub file_name: String,
}

fn session_for(user: &Option<String>) -> SessionContext {
    SessionContext::new(user.clone().unwrap_or_default())
}

#[post("/ask")]
async fn ask(data: web::Data<HttpState>, req: web::Json<AskRequest>) -> impl Responder {
    let session = session_for(&req.user);
    let question = preprocess_question(&req.question);
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Ask from {}: {}", session.user, question),
    );

    if question.is_empty() {
        return HttpResponse::Ok().json(Translation {
            sql: None,
            result: ExecutionResult::failure("Question is empty."),
        });
    }

    let translation = data.translator.translate(&question, &session).await;
    if let Some(error) = translation.result.error_message() {
        add_log(
            &data.logs,
            "WARN",
            "HttpApi",
            &format!("Ask failed: {}", error),
        );
    }
    HttpResponse::Ok().json(translation)
}

#[post("/execute")]
async fn execute(data: web::Data<HttpState>, req: web::Json<ExecuteRequest>) -> impl Responder {
    let session = session_for(&req.user);
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!("Execute from {}: {}", session.user, req.sql),
    );

    let result = data.gateway.execute(&req.sql, &session).await;
    if let Some(error) = result.error_message() {
        add_log(
            &data.logs,
            "WARN",
            "HttpApi",
            &format!("Execute failed: {}", error),
        );
    }
    HttpResponse::Ok().json(result)
}

#[get("/schema")]
async fn schema(data: web::Data<HttpState>) -> impl Responder {
    match data.introspector.introspect().await {
        Ok(schema) => HttpResponse::Ok().json(schema),
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "HttpApi",
                &format!("Schema introspection failed: {}", e),
            );
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

#[get("/audit")]
async fn audit_log(data: web::Data<HttpState>, query: web::Query<AuditQuery>) -> impl Responder {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    match data.audit.recent(limit).await {
        Ok(records) => HttpResponse::Ok().json(records),
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "HttpApi",
                &format!("Audit fetch failed: {}", e),
            );
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

#[post("/backups")]
async fn create_backup(data: web::Data<HttpState>) -> impl Responder {
    let backups = data.backups.clone();
    match web::block(move || backups.create_backup()).await {
        Ok(outcome) => {
            add_log(&data.logs, "INFO", "Backup", &outcome.message);
            HttpResponse::Ok().json(outcome)
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

#[get("/backups")]
async fn list_backups(data: web::Data<HttpState>) -> impl Responder {
    match data.backups.list_backups() {
        Ok(backups) => HttpResponse::Ok().json(backups),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

#[post("/backups/restore")]
async fn restore_backup(
    data: web::Data<HttpState>,
    req: web::Json<RestoreRequest>,
) -> impl Responder {
    let backups = data.backups.clone();
    let file_name = req.into_inner().file_name;
    match web::block(move || backups.restore_backup(&file_name)).await {
        Ok(outcome) => {
            let level = if outcome.success { "INFO" } else { "ERROR" };
            add_log(&data.logs, level, "Backup", &outcome.message);
            HttpResponse::Ok().json(outcome)
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    match data.logs.lock() {
        Ok(logs) => HttpResponse::Ok().json(&*logs),
        Err(_) => HttpResponse::Ok().json(Vec::<LogEntry>::new()),
    }
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    if let Ok(mut logs) = logs.lock() {
        logs.push(entry.clone());
        if logs.len() > MAX_LOG_ENTRIES {
            logs.remove(0);
        }
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(ask)
            .service(execute)
            .service(schema)
            .service(audit_log)
            .service(restore_backup)
            .service(create_backup)
            .service(list_backups)
            .service(get_logs),
    );
}

pub fn start_server(state: HttpState, config: &ServerConfig) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::Result;
    use crate::domain::llm_config::LLMConfig;
    use crate::infrastructure::config::BackupConfig;
    use crate::infrastructure::db::sqlite::SqliteStore;
    use crate::infrastructure::llm_clients::LLMClient;
    use actix_web::test;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct FixedReply(&'static str);

    #[async_trait]
    impl LLMClient for FixedReply {
        async fn generate(&self, _config: &LLMConfig, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    async fn state(dir: &std::path::Path, reply: &'static str) -> web::Data<HttpState> {
        let db_path = dir.join("company.db");
        let store = SqliteStore::new(&db_path);
        store
            .run_statement(
                "CREATE TABLE clients (client_id INTEGER PRIMARY KEY, client_name TEXT)",
                false,
            )
            .await
            .unwrap();
        let audit = AuditService::new(store.clone());
        audit.ensure_table().await.unwrap();
        let gateway = SqlGateway::new(store.clone(), audit.clone());
        let introspector = SchemaIntrospector::new(store);
        let translator = NlToSqlTranslator::new(
            Arc::new(FixedReply(reply)),
            LLMConfig::default(),
            gateway.clone(),
            introspector.clone(),
        );
        web::Data::new(HttpState {
            translator: Arc::new(translator),
            gateway,
            introspector,
            audit,
            backups: BackupService::new(
                db_path,
                BackupConfig {
                    dir: dir.join("backups"),
                    prefix: "company".to_string(),
                },
            ),
            logs: Arc::new(Mutex::new(Vec::new())),
        })
    }

    #[actix_web::test]
    async fn test_execute_then_audit() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(dir.path(), "").await)
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/execute")
            .set_json(json!({"sql": "INSERT INTO clients (client_name) VALUES ('Acme')", "user": "alice"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"columns": [], "rows": []}));

        let req = test::TestRequest::get().uri("/api/audit?limit=5").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["user"], "alice");
        assert_eq!(body[0]["table_name"], "clients");
    }

    #[actix_web::test]
    async fn test_rejection_is_200_with_error_body() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(dir.path(), "").await)
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/execute")
            .set_json(json!({"sql": "DROP TABLE clients"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["error"],
            "Only SELECT, INSERT, UPDATE, DELETE queries are allowed."
        );
    }

    #[actix_web::test]
    async fn test_ask_returns_sql_and_result() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(dir.path(), "SELECT client_name FROM clients;").await)
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/ask")
            .set_json(json!({"question": "SQL: list every customer"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["sql"], "SELECT client_name FROM clients;");
        assert_eq!(body["result"], json!({"columns": ["client_name"], "rows": []}));
    }

    #[actix_web::test]
    async fn test_schema_and_backups() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(dir.path(), "").await)
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/schema").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["tables"]["clients"][1]["name"], "client_name");

        let req = test::TestRequest::post().uri("/api/backups").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);

        let req = test::TestRequest::get().uri("/api/backups").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        let file_name = body[0]["file_name"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/api/backups/restore")
            .set_json(json!({"file_name": file_name}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
    }

    #[actix_web::test]
    async fn test_restore_rejects_arbitrary_paths() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state(dir.path(), "").await)
                .configure(routes),
        )
        .await;
        let db_path = dir.path().join("company.db");
        let before = std::fs::read(&db_path).unwrap();

        let outside = dir.path().join("not_a_backup.txt");
        std::fs::write(&outside, b"hello").unwrap();

        let req = test::TestRequest::post()
            .uri("/api/backups/restore")
            .set_json(json!({"file_name": outside.to_str().unwrap()}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(std::fs::read(&db_path).unwrap(), before);

        let req = test::TestRequest::post()
            .uri("/api/execute")
            .set_json(json!({"sql": "SELECT client_id FROM clients"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"columns": ["client_id"], "rows": []}));
    }
}
