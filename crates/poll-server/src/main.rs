use poll_server::{PollServer, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration
    let config = ServerConfig::load()?;

    // Create and start server
    let server = PollServer::new(config)?;
    server.start().await?;

    Ok(())
}
