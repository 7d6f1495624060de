#![allow(dead_code)]

use async_trait::async_trait;
use chrono::TimeZone;
use chrono_tz::UTC;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use weektab::components::google_calendar::models::{CalendarListEntry, EventMarker, RawEvent};
use weektab::components::google_calendar::time::current_week;
use weektab::components::google_calendar::{
    CalendarPipeline, CalendarSource, FailurePolicy, IdentityProvider, PipelineSettings, Session,
    WeekWindow,
};
use weektab::error::{auth_error, fetch_error, Error, TabResult};

/// Mock calendar service keyed by calendar id
#[derive(Default)]
pub struct MockCalendarSource {
    pub calendars: Vec<CalendarListEntry>,
    pub events: HashMap<String, Vec<RawEvent>>,
    pub failing: HashSet<String>,
    pub reject_token: Mutex<Option<String>>,
    pub list_calls: AtomicUsize,
    pub event_calls: AtomicUsize,
}

impl MockCalendarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calendar(mut self, id: &str, summary: &str, color: &str, events: Vec<RawEvent>) -> Self {
        self.calendars.push(CalendarListEntry {
            id: id.to_string(),
            summary: Some(summary.to_string()),
            summary_override: None,
            background_color: Some(color.to_string()),
        });
        self.events.insert(id.to_string(), events);
        self
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    /// Answer 401 whenever `token` is presented
    pub fn rejecting(self, token: &str) -> Self {
        *self.reject_token.lock().unwrap() = Some(token.to_string());
        self
    }

    fn check_token(&self, token: &str) -> TabResult<()> {
        if self.reject_token.lock().unwrap().as_deref() == Some(token) {
            return Err(Error::HttpStatus {
                context: "Failed to fetch calendar list".to_string(),
                status: 401,
                body: "Invalid Credentials".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarSource for MockCalendarSource {
    async fn list_calendars(&self, token: &str) -> TabResult<Vec<CalendarListEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(token)?;
        Ok(self.calendars.clone())
    }

    async fn list_events(
        &self,
        token: &str,
        calendar_id: &str,
        _window: &WeekWindow,
    ) -> TabResult<Vec<RawEvent>> {
        self.event_calls.fetch_add(1, Ordering::SeqCst);
        self.check_token(token)?;
        if self.failing.contains(calendar_id) {
            return Err(fetch_error(&format!("calendar {} unavailable", calendar_id)));
        }
        Ok(self.events.get(calendar_id).cloned().unwrap_or_default())
    }
}

/// Identity provider handing out numbered tokens
#[derive(Default)]
pub struct MockIdentityProvider {
    pub calls: AtomicUsize,
    pub deny: bool,
}

impl MockIdentityProvider {
    pub fn denying() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            deny: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn get_auth_token(&self, _interactive: bool) -> TabResult<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(auth_error("The user did not approve access"));
        }
        Ok(format!("token-{}", n))
    }
}

pub fn timed(summary: &str, start: &str, end: &str) -> RawEvent {
    RawEvent {
        summary: Some(summary.to_string()),
        location: None,
        start: EventMarker::date_time(start),
        end: EventMarker::date_time(end),
    }
}

pub fn all_day(summary: &str, date: &str, end_date: &str) -> RawEvent {
    RawEvent {
        summary: Some(summary.to_string()),
        location: None,
        start: EventMarker::date(date),
        end: EventMarker::date(end_date),
    }
}

/// Week of Monday 2024-01-01 in UTC
pub fn test_window() -> WeekWindow {
    current_week(UTC.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap()).unwrap()
}

pub fn settings(names: &[&str], policy: FailurePolicy) -> PipelineSettings {
    PipelineSettings {
        calendar_names: names.iter().map(|s| s.to_string()).collect(),
        policy,
        timezone: UTC,
    }
}

pub fn pipeline(
    source: Arc<MockCalendarSource>,
    provider: Arc<MockIdentityProvider>,
    names: &[&str],
    policy: FailurePolicy,
) -> CalendarPipeline {
    let session = Arc::new(Session::new(provider));
    CalendarPipeline::new(session, source, settings(names, policy))
}

/// Calendar service that holds every events request open for `delay`
/// and records how many were open at once
pub struct SlowCalendarSource {
    pub inner: MockCalendarSource,
    pub delay: std::time::Duration,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl SlowCalendarSource {
    pub fn new(inner: MockCalendarSource, delay: std::time::Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CalendarSource for SlowCalendarSource {
    async fn list_calendars(&self, token: &str) -> TabResult<Vec<CalendarListEntry>> {
        self.inner.list_calendars(token).await
    }

    async fn list_events(
        &self,
        token: &str,
        calendar_id: &str,
        window: &WeekWindow,
    ) -> TabResult<Vec<RawEvent>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = self.inner.list_events(token, calendar_id, window).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
