mod actor;
pub mod aggregator;
pub mod client;
mod handle;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod time;
pub mod token;

pub use aggregator::FailurePolicy;
pub use client::{CalendarSource, GoogleCalendarClient};
pub use handle::GoogleCalendarHandle;
pub use models::{CalendarRef, DisplayEvent, EventTime, WeekBuckets};
pub use pipeline::{CalendarPipeline, PipelineSettings};
pub use time::WeekWindow;
pub use token::{IdentityProvider, LoopbackOAuthProvider, Session, StaticTokenProvider};

use crate::config::Config;
use crate::error::{env_error, TabResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Pick the identity provider the config allows
pub fn identity_provider(config: &Config) -> TabResult<Arc<dyn IdentityProvider>> {
    if let Some(token) = &config.google_access_token {
        info!("Using access token from GOOGLE_ACCESS_TOKEN");
        return Ok(Arc::new(StaticTokenProvider::new(token.clone())));
    }

    match (&config.google_client_id, &config.google_client_secret) {
        (Some(id), Some(secret)) => Ok(Arc::new(LoopbackOAuthProvider::new(
            id.clone(),
            secret.clone(),
            config.oauth_redirect_port,
        ))),
        _ => Err(env_error(
            "GOOGLE_ACCESS_TOKEN, or GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET",
        )),
    }
}

/// Calendar component owning the fetch actor
#[derive(Default)]
pub struct GoogleCalendar {
    handle: RwLock<Option<GoogleCalendarHandle>>,
    source: Option<Arc<dyn CalendarSource>>,
    provider: Option<Arc<dyn IdentityProvider>>,
}

impl GoogleCalendar {
    /// Component talking to the API configured in `Config`
    pub fn new() -> Self {
        Self::default()
    }

    /// Component with a given calendar source and identity provider
    pub fn with_parts(source: Arc<dyn CalendarSource>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            handle: RwLock::new(None),
            source: Some(source),
            provider: Some(provider),
        }
    }

    /// Get the handle if it exists
    pub async fn get_handle(&self) -> Option<GoogleCalendarHandle> {
        self.handle.read().await.clone()
    }
}

#[async_trait]
impl super::Component for GoogleCalendar {
    fn name(&self) -> &'static str {
        "google_calendar"
    }

    async fn init(&self, config: Arc<RwLock<Config>>) -> TabResult<()> {
        let mut handle_lock = self.handle.write().await;
        if handle_lock.is_some() {
            return Ok(());
        }

        let config = config.read().await;
        let source: Arc<dyn CalendarSource> = match &self.source {
            Some(source) => Arc::clone(source),
            None => Arc::new(GoogleCalendarClient::new(&config.calendar_api_base)?),
        };
        let provider = match &self.provider {
            Some(provider) => Arc::clone(provider),
            None => identity_provider(&config)?,
        };
        let settings = PipelineSettings::from_config(&config)?;
        info!(
            "Watching {} calendars, failure policy {}",
            settings.calendar_names.len(),
            settings.policy
        );

        let session = Arc::new(Session::new(provider));
        let pipeline = CalendarPipeline::new(session, source, settings);
        *handle_lock = Some(GoogleCalendarHandle::new(pipeline));

        Ok(())
    }

    async fn shutdown(&self) -> TabResult<()> {
        let handle_lock = self.handle.read().await;
        if let Some(handle) = &*handle_lock {
            handle.shutdown().await?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
