use super::models::{EventMarker, EventTime};
use crate::error::{fetch_error, other_error, TabResult};
use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, SecondsFormat,
    TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;

/// Day slot for a weekday: Monday is 0, Sunday is 6
pub fn day_index(weekday: Weekday) -> usize {
    // num_days_from_sunday() counts Sunday as 0
    ((weekday.num_days_from_sunday() + 6) % 7) as usize
}

/// A closed range of instants the calendar is fetched for
#[derive(Debug, Clone, PartialEq)]
pub struct WeekWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl WeekWindow {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> TabResult<Self> {
        if end < start {
            return Err(other_error(&format!(
                "Window end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a window from two RFC 3339 strings, shown in `tz`
    pub fn from_rfc3339(time_min: &str, time_max: &str, tz: Tz) -> TabResult<Self> {
        let parse = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&tz))
                .map_err(|e| other_error(&format!("Invalid instant '{}': {}", s, e)))
        };
        Self::new(parse(time_min)?, parse(time_max)?)
    }

    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }

    /// `timeMin` query value, UTC with milliseconds
    pub fn time_min(&self) -> String {
        to_query_instant(&self.start)
    }

    /// `timeMax` query value, UTC with milliseconds
    pub fn time_max(&self) -> String {
        to_query_instant(&self.end)
    }

    /// Calendar date of the first day of the window
    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

fn to_query_instant(dt: &DateTime<Tz>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Monday 00:00:00.000 through Sunday 23:59:59.999 of the week containing `now`
pub fn current_week(now: DateTime<Tz>) -> TabResult<WeekWindow> {
    let tz = now.timezone();
    let today = now.date_naive();

    let monday = today
        .checked_sub_days(Days::new(today.weekday().num_days_from_monday() as u64))
        .ok_or_else(|| other_error("Failed to compute start of week"))?;
    let sunday = monday
        .checked_add_days(Days::new(6))
        .ok_or_else(|| other_error("Failed to compute end of week"))?;

    let start_naive = monday
        .and_hms_milli_opt(0, 0, 0, 0)
        .ok_or_else(|| other_error("Failed to create datetime"))?;
    let end_naive = sunday
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| other_error("Failed to create datetime"))?;

    let start = match tz.from_local_datetime(&start_naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // Midnight skipped by a DST change; the day starts an hour later
        LocalResult::None => resolve_after_gap(tz, start_naive)?,
    };
    let end = match tz.from_local_datetime(&end_naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(_, latest) => latest,
        LocalResult::None => resolve_after_gap(tz, end_naive)?,
    };

    WeekWindow::new(start, end)
}

fn resolve_after_gap(tz: Tz, naive: NaiveDateTime) -> TabResult<DateTime<Tz>> {
    tz.from_local_datetime(&(naive + Duration::hours(1)))
        .earliest()
        .ok_or_else(|| other_error(&format!("Invalid local time {}", naive)))
}

/// A parsed start or end marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Moment {
    At(DateTime<Tz>),
    Day(NaiveDate),
}

impl Moment {
    /// Calendar date the moment falls on in the display timezone
    pub fn date(&self) -> NaiveDate {
        match self {
            Moment::At(dt) => dt.date_naive(),
            Moment::Day(date) => *date,
        }
    }

    pub fn day_index(&self) -> usize {
        day_index(self.date().weekday())
    }
}

/// Parse a marker, preferring the date-time over the date when both are set
pub fn parse_marker(marker: &EventMarker, tz: Tz) -> TabResult<Moment> {
    if let Some(date_time) = &marker.date_time {
        let dt = DateTime::parse_from_rfc3339(date_time)
            .map_err(|e| fetch_error(&format!("Failed to parse datetime '{}': {}", date_time, e)))?;
        Ok(Moment::At(dt.with_timezone(&tz)))
    } else if let Some(date) = &marker.date {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| fetch_error(&format!("Failed to parse date '{}': {}", date, e)))?;
        Ok(Moment::Day(date))
    } else {
        Err(fetch_error("Event marker has neither date nor dateTime"))
    }
}

/// Time of day for an event given its parsed start and optional end
pub fn event_time(start: &Moment, end: Option<&Moment>) -> EventTime {
    match start {
        Moment::Day(_) => EventTime::AllDay,
        Moment::At(start) => {
            let end = match end {
                Some(Moment::At(end)) => end.time(),
                _ => start.time(),
            };
            EventTime::Timed {
                start: start.time(),
                end,
            }
        }
    }
}

/// Day header date, "D/M" without padding
pub fn day_label(date: NaiveDate) -> String {
    format!("{}/{}", date.day(), date.month())
}
