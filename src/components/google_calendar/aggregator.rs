use super::client::CalendarSource;
use super::models::{CalendarRef, DisplayEvent, RawEvent, WeekBuckets, NO_LOCATION, NO_TITLE};
use super::time::{event_time, parse_marker, WeekWindow};
use crate::error::{config_error, Error, TabResult};
use chrono_tz::Tz;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// How failed calendars affect the combined week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Any failed calendar fails the whole week
    #[default]
    AllOrNothing,
    /// Failed calendars are left out
    SkipFailed,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all-or-nothing" => Ok(FailurePolicy::AllOrNothing),
            "skip-failed" => Ok(FailurePolicy::SkipFailed),
            other => Err(config_error(&format!(
                "Unknown failure policy '{}', expected all-or-nothing or skip-failed",
                other
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::AllOrNothing => write!(f, "all-or-nothing"),
            FailurePolicy::SkipFailed => write!(f, "skip-failed"),
        }
    }
}

/// Result of loading one calendar's week
#[derive(Debug)]
pub struct CalendarOutcome {
    pub calendar: CalendarRef,
    pub result: TabResult<WeekBuckets>,
}

/// Fetch every calendar concurrently and collect each result
///
/// All requests run to completion; a failure does not cancel its siblings.
pub async fn fetch_calendars(
    source: &dyn CalendarSource,
    token: &str,
    calendars: &[CalendarRef],
    window: &WeekWindow,
) -> Vec<CalendarOutcome> {
    let tz = window.timezone();
    let requests = calendars.iter().map(|calendar| async move {
        let result = source
            .list_events(token, &calendar.id, window)
            .await
            .and_then(|events| bucket_events(&events, calendar, tz));
        CalendarOutcome {
            calendar: calendar.clone(),
            result,
        }
    });
    join_all(requests).await
}

/// Merge per-calendar outcomes under `policy`
pub fn combine(outcomes: Vec<CalendarOutcome>, policy: FailurePolicy) -> TabResult<WeekBuckets> {
    let mut week = WeekBuckets::new();
    for outcome in outcomes {
        match (outcome.result, policy) {
            (Ok(buckets), _) => week.extend(buckets),
            (Err(e), FailurePolicy::AllOrNothing) => return Err(e),
            (Err(e), FailurePolicy::SkipFailed) => {
                warn!(
                    "Skipping calendar '{}' ({}): {}",
                    outcome.calendar.display_name, outcome.calendar.id, e
                );
            }
        }
    }
    Ok(week)
}

/// Events of all `calendars` in `window`, bucketed by weekday
pub async fn aggregate_week(
    source: &dyn CalendarSource,
    token: &str,
    calendars: &[CalendarRef],
    window: &WeekWindow,
    policy: FailurePolicy,
) -> TabResult<WeekBuckets> {
    let outcomes = fetch_calendars(source, token, calendars, window).await;
    let week = combine(outcomes, policy)?;
    debug!("Aggregated {} events from {} calendars", week.len(), calendars.len());
    Ok(week)
}

/// Bucket one calendar's events
pub fn bucket_events(events: &[RawEvent], calendar: &CalendarRef, tz: Tz) -> TabResult<WeekBuckets> {
    let mut week = WeekBuckets::new();
    for event in events {
        let (day, display) = to_display_event(event, calendar, tz)?;
        week.push(day, display)?;
    }
    Ok(week)
}

/// Day slot and display form of a raw event
pub fn to_display_event(event: &RawEvent, calendar: &CalendarRef, tz: Tz) -> TabResult<(usize, DisplayEvent)> {
    let start = parse_marker(&event.start, tz)?;
    let end = parse_marker(&event.end, tz).ok();

    let display = DisplayEvent {
        summary: event
            .summary
            .clone()
            .unwrap_or_else(|| NO_TITLE.to_string()),
        time: event_time(&start, end.as_ref()),
        location: event
            .location
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| NO_LOCATION.to_string()),
        color: calendar.color.clone(),
    };

    Ok((start.day_index(), display))
}
