use tracing_subscriber::EnvFilter;
use upload_registry::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env()?;
    let app = upload_registry::app(&config)?;

    let addr = config.socket_addr()?;
    tracing::info!(
        storage = ?config.storage_type,
        root = %config.storage_path.display(),
        "Server running on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
