use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use promptboard::config::{Cli, Config};
use promptboard::routes;
use promptboard::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    tracing::info!(
        "Repeat votes: {:?}, system user: {}",
        config.votes.repeat_policy,
        config.prompts.system_user
    );

    // Database, migrations, system user, media root
    let state = AppState::bootstrap(config)?;
    let addr: SocketAddr =
        format!("{}:{}", state.config.server.host, state.config.server.port).parse()?;

    let app = routes::app(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
