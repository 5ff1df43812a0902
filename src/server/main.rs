use tracing_subscriber::EnvFilter;

use warden::config;
use warden::server::bootstrap;

#[tokio::main]
async fn main() {
    let config = config::init_config().expect("failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = bootstrap::run(config.clone()).await {
        tracing::error!(error = %e, "warden exited with error");
        std::process::exit(1);
    }
}
