use super::aggregator::{aggregate_week, FailurePolicy};
use super::client::CalendarSource;
use super::models::WeekBuckets;
use super::resolver::resolve_calendars;
use super::time::{current_week, WeekWindow};
use super::token::Session;
use crate::config::Config;
use crate::error::TabResult;
use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{error, info};

/// Settings the fetch depends on, taken from the config at startup
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub calendar_names: Vec<String>,
    pub policy: FailurePolicy,
    pub timezone: Tz,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> TabResult<Self> {
        Ok(Self {
            calendar_names: config.calendar_names.clone(),
            policy: config.failure_policy,
            timezone: config.timezone()?,
        })
    }
}

/// Token, calendar list and events, in that order
pub struct CalendarPipeline {
    session: Arc<Session>,
    source: Arc<dyn CalendarSource>,
    settings: PipelineSettings,
}

impl CalendarPipeline {
    pub fn new(session: Arc<Session>, source: Arc<dyn CalendarSource>, settings: PipelineSettings) -> Self {
        Self {
            session,
            source,
            settings,
        }
    }

    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    pub fn timezone(&self) -> Tz {
        self.settings.timezone
    }

    /// This week in the display timezone
    pub fn current_window(&self) -> TabResult<WeekWindow> {
        current_week(Utc::now().with_timezone(&self.settings.timezone))
    }

    /// Run the fetch, propagating any failure
    pub async fn try_fetch(&self, window: &WeekWindow) -> TabResult<WeekBuckets> {
        let result = self.fetch_inner(window).await;
        if let Err(e) = &result {
            if e.is_unauthorized() {
                self.session.invalidate().await;
            }
        }
        result
    }

    async fn fetch_inner(&self, window: &WeekWindow) -> TabResult<WeekBuckets> {
        let token = self.session.get_token().await?;
        let calendars =
            resolve_calendars(self.source.as_ref(), &token, &self.settings.calendar_names).await?;
        aggregate_week(
            self.source.as_ref(),
            &token,
            &calendars,
            window,
            self.settings.policy,
        )
        .await
    }

    /// Events for `window` (this week when absent); failures are logged and give an empty week
    pub async fn fetch_calendar_events(&self, window: Option<WeekWindow>) -> WeekBuckets {
        let window = match window {
            Some(window) => window,
            None => match self.current_window() {
                Ok(window) => window,
                Err(e) => {
                    error!("Error computing week window: {}", e);
                    return WeekBuckets::new();
                }
            },
        };

        info!("Fetching calendar events {} - {}", window.time_min(), window.time_max());
        match self.try_fetch(&window).await {
            Ok(week) => week,
            Err(e) => {
                error!("Error fetching calendar events: {}", e);
                WeekBuckets::new()
            }
        }
    }
}
