use crate::components::google_calendar::models::{DisplayEvent, EventTime, WeekBuckets};
use crate::components::google_calendar::time::day_label;
use crate::error::TabResult;
use askama::Template;
use chrono::{Days, NaiveDate};
use rand::seq::IndexedRandom;
use rand::Rng;

pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const ALL_DAY_TEXT: &str = "All day";

/// One event block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventView {
    pub summary: String,
    pub time_label: String,
    /// Empty when the event has no location
    pub location: String,
    pub color: String,
}

impl From<&DisplayEvent> for EventView {
    fn from(event: &DisplayEvent) -> Self {
        let time_label = match event.time {
            EventTime::AllDay => ALL_DAY_TEXT.to_string(),
            EventTime::Timed { .. } => format!("{} - {}", event.start_label(), event.end_label()),
        };
        Self {
            summary: event.summary.clone(),
            time_label,
            location: if event.has_location() {
                event.location.clone()
            } else {
                String::new()
            },
            color: event.color.clone().unwrap_or_default(),
        }
    }
}

/// One day column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayView {
    pub name: &'static str,
    pub date_label: String,
    pub events: Vec<EventView>,
}

#[derive(Template)]
#[template(path = "newtab.html")]
pub struct NewTabPage {
    pub days: Vec<DayView>,
    pub background: Option<String>,
}

/// Order a day's events by start time, all-day events first
pub fn sort_day(events: &mut [DisplayEvent]) {
    events.sort_by_key(|event| match event.time {
        EventTime::AllDay => None,
        EventTime::Timed { start, .. } => Some(start),
    });
}

/// Sorted day columns for the week starting on `monday`
pub fn build_week_view(week: WeekBuckets, monday: NaiveDate) -> Vec<DayView> {
    week.into_days()
        .into_iter()
        .zip(DAY_NAMES)
        .enumerate()
        .map(|(index, (mut events, name))| {
            sort_day(&mut events);
            let date = monday
                .checked_add_days(Days::new(index as u64))
                .unwrap_or(monday);
            DayView {
                name,
                date_label: day_label(date),
                events: events.iter().map(EventView::from).collect(),
            }
        })
        .collect()
}

/// Uniformly random background, none when the list is empty
pub fn pick_background<R: Rng + ?Sized>(images: &[String], rng: &mut R) -> Option<String> {
    images.choose(rng).cloned()
}

/// Full new-tab page HTML
pub fn render_page(week: WeekBuckets, monday: NaiveDate, images: &[String]) -> TabResult<String> {
    let page = NewTabPage {
        days: build_week_view(week, monday),
        background: pick_background(images, &mut rand::rng()),
    };
    Ok(page.render()?)
}
