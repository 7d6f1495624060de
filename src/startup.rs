use crate::components::{Clock, ComponentManager, GoogleCalendar};
use crate::config::Config;
use crate::error::{component_error, Error};
use crate::server::{router, AppState};
use crate::shutdown;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load and initialize the application config
pub async fn load_config() -> miette::Result<Arc<RwLock<Config>>> {
    match Config::load() {
        Ok(config) => Ok(Arc::new(RwLock::new(config))),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Start the components and serve the new-tab page until a shutdown signal
pub async fn start_server(config: Arc<RwLock<Config>>) -> miette::Result<()> {
    let mut component_manager = ComponentManager::new(Arc::clone(&config));
    component_manager.register(Clock::new());
    component_manager.register(GoogleCalendar::new());
    component_manager.init_all().await?;

    let component_manager = Arc::new(component_manager);

    let calendar = match component_manager.get::<GoogleCalendar>() {
        Some(component) => component.get_handle().await,
        None => None,
    }
    .ok_or_else(|| component_error("Google Calendar component failed to start"))?;

    let clock = component_manager
        .get::<Clock>()
        .map(Clock::subscribe)
        .ok_or_else(|| component_error("Clock component missing"))?;

    let (port, images_dir, background_images) = {
        let config_read = config.read().await;
        (
            config_read.port,
            config_read.images_dir.clone(),
            config_read.background_images.clone(),
        )
    };

    let state = AppState {
        calendar,
        clock,
        background_images: Arc::new(background_images),
    };
    let app = router(state, &images_dir);

    // Cancelled by the signal handler once components are down
    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown::handle_signals(
        shutdown_token.clone(),
        Arc::clone(&component_manager),
    ));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(Error::from)?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await
        .map_err(Error::from)?;

    info!("Server stopped");
    Ok(())
}
