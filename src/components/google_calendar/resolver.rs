use super::client::CalendarSource;
use super::models::{CalendarListEntry, CalendarRef};
use crate::error::TabResult;
use tracing::debug;

/// Calendars whose override or default name is in `allow_list`, in API order
pub async fn resolve_calendars(
    source: &dyn CalendarSource,
    token: &str,
    allow_list: &[String],
) -> TabResult<Vec<CalendarRef>> {
    let entries = source.list_calendars(token).await?;
    let calendars = filter_calendars(entries, allow_list);
    debug!(
        "Matched {} calendars: {:?}",
        calendars.len(),
        calendars.iter().map(|c| c.display_name.as_str()).collect::<Vec<_>>()
    );
    Ok(calendars)
}

/// Exact, case-sensitive match against either name field
pub fn filter_calendars(entries: Vec<CalendarListEntry>, allow_list: &[String]) -> Vec<CalendarRef> {
    let allowed = |name: &Option<String>| {
        name.as_ref()
            .is_some_and(|n| allow_list.iter().any(|a| a == n))
    };

    entries
        .into_iter()
        .filter(|entry| allowed(&entry.summary_override) || allowed(&entry.summary))
        .map(|entry| CalendarRef {
            display_name: entry
                .summary_override
                .or(entry.summary)
                .unwrap_or_default(),
            id: entry.id,
            color: entry.background_color,
        })
        .collect()
}
