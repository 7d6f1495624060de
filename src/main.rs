use tracing::info;
use weektab::startup;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting weektab");

    // Load configuration
    let config = startup::load_config().await?;

    // Serve the page
    startup::start_server(config).await
}
