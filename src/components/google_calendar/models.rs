use crate::error::{other_error, TabResult};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize, Serializer};
use serde::ser::SerializeStruct;

/// Location shown when an event has none
pub const NO_LOCATION: &str = "No location";

/// Summary used when an event has no title
pub const NO_TITLE: &str = "(No title)";

/// Label carried by all-day events in place of a clock time
pub const ALL_DAY_LABEL: &str = "NaN:NaN";

/// One page of `users/me/calendarList`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarList {
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
}

/// Calendar descriptor as returned by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    pub summary: Option<String>,
    pub summary_override: Option<String>,
    pub background_color: Option<String>,
}

/// One page of `calendars/{id}/events`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<RawEvent>,
}

/// Event descriptor as returned by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEvent {
    pub summary: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventMarker,
    #[serde(default)]
    pub end: EventMarker,
}

/// Start or end of an event: a date for all-day events, a date-time otherwise
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMarker {
    pub date: Option<String>,
    pub date_time: Option<String>,
}

impl EventMarker {
    pub fn date(date: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            date_time: None,
        }
    }

    pub fn date_time(date_time: &str) -> Self {
        Self {
            date: None,
            date_time: Some(date_time.to_string()),
        }
    }
}

/// A remote calendar that matched the allow-list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRef {
    pub id: String,
    pub display_name: String,
    pub color: Option<String>,
}

/// When an event happens within its day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Timed { start: NaiveTime, end: NaiveTime },
    AllDay,
}

/// An event ready to be shown in a day column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEvent {
    pub summary: String,
    pub time: EventTime,
    pub location: String,
    pub color: Option<String>,
}

impl DisplayEvent {
    pub fn is_all_day(&self) -> bool {
        matches!(self.time, EventTime::AllDay)
    }

    /// "HH:MM" for timed events, the all-day label otherwise
    pub fn start_label(&self) -> String {
        match self.time {
            EventTime::Timed { start, .. } => start.format("%H:%M").to_string(),
            EventTime::AllDay => ALL_DAY_LABEL.to_string(),
        }
    }

    pub fn end_label(&self) -> String {
        match self.time {
            EventTime::Timed { end, .. } => end.format("%H:%M").to_string(),
            EventTime::AllDay => ALL_DAY_LABEL.to_string(),
        }
    }

    pub fn has_location(&self) -> bool {
        self.location != NO_LOCATION
    }
}

impl Serialize for DisplayEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DisplayEvent", 6)?;
        state.serialize_field("summary", &self.summary)?;
        state.serialize_field("start", &self.start_label())?;
        state.serialize_field("end", &self.end_label())?;
        state.serialize_field("allDay", &self.is_all_day())?;
        state.serialize_field("location", &self.location)?;
        state.serialize_field("color", &self.color)?;
        state.end()
    }
}

/// Seven day slots, Monday first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeekBuckets {
    days: [Vec<DisplayEvent>; 7],
}

impl WeekBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to a day; `day` is 0 for Monday through 6 for Sunday
    /// and anything else is rejected
    pub fn push(&mut self, day: usize, event: DisplayEvent) -> TabResult<()> {
        let slot = self
            .days
            .get_mut(day)
            .ok_or_else(|| other_error(&format!("Day index {} is outside the week", day)))?;
        slot.push(event);
        Ok(())
    }

    /// Events of one day; empty for an index outside 0..7
    pub fn day(&self, day: usize) -> &[DisplayEvent] {
        self.days.get(day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn days(&self) -> &[Vec<DisplayEvent>; 7] {
        &self.days
    }

    pub fn into_days(self) -> [Vec<DisplayEvent>; 7] {
        self.days
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.days.iter().map(Vec::len).sum()
    }

    /// Move every event of `other` into the same day of `self`
    pub fn extend(&mut self, other: WeekBuckets) {
        for (day, events) in other.days.into_iter().enumerate() {
            self.days[day].extend(events);
        }
    }
}
