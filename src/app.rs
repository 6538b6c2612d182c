use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::domain::error::Result;
use crate::infrastructure::bootstrap::Services;
use crate::infrastructure::config::AppConfig;
use crate::interfaces::http::start_server;

pub fn run() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.log_level);

    actix_web::rt::System::new().block_on(serve(config))
}

async fn serve(config: AppConfig) -> Result<()> {
    let services = Services::build(&config).await?;
    let server = start_server(services.into_http_state(), &config.server)?;
    info!(
        "HTTP API listening on http://{}:{}/api",
        config.server.host, config.server.port
    );
    server.await?;
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
