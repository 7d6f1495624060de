use super::actor::{GoogleCalendarActor, GoogleCalendarActorHandle};
use super::models::WeekBuckets;
use super::pipeline::CalendarPipeline;
use super::time::WeekWindow;
use crate::error::TabResult;
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handle for interacting with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarHandle {
    actor_handle: GoogleCalendarActorHandle,
    timezone: Tz,
    _actor_task: Arc<JoinHandle<()>>,
}

impl GoogleCalendarHandle {
    /// Create a new GoogleCalendarHandle and spawn the actor
    pub fn new(pipeline: CalendarPipeline) -> Self {
        let timezone = pipeline.timezone();
        let (mut actor, handle) = GoogleCalendarActor::new(pipeline);

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            timezone,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Display timezone of the fetched week
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Events for `window`, or this week; empty on failure
    pub async fn fetch_calendar_events(&self, window: Option<WeekWindow>) -> TabResult<WeekBuckets> {
        self.actor_handle.fetch_week(window).await
    }

    /// Events for `window`, surfacing failures
    pub async fn try_fetch_calendar_events(&self, window: WeekWindow) -> TabResult<WeekBuckets> {
        self.actor_handle.try_fetch_week(window).await
    }

    /// Clear the cached token
    pub async fn sign_out(&self) -> TabResult<()> {
        self.actor_handle.sign_out().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> TabResult<()> {
        self.actor_handle.shutdown().await
    }
}
