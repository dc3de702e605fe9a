use anyhow::Result;
use clicktoeat_backend::routes::RouteDelegates;
use clicktoeat_backend::server;
use clicktoeat_backend::settings::Settings;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting ClickToEat backend...");

    // Load configuration; anything malformed aborts here
    let settings = Settings::from_env()?;

    // Start web server; handler groups are delegated to the embedding app
    server::start_server(settings, RouteDelegates::default()).await?;

    Ok(())
}
