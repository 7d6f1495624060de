mod common;

use common::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;
use std::time::Duration;
use weektab::components::google_calendar::{
    CalendarPipeline, CalendarSource, EventTime, FailurePolicy, GoogleCalendar, IdentityProvider,
    Session,
};
use weektab::components::{Component, ComponentManager};
use weektab::config::Config;
use weektab::presenter::build_week_view;

/// Monday 09:00-10:00 standup in the only matching calendar
#[tokio::test]
async fn test_standup_scenario() {
    let source = Arc::new(MockCalendarSource::new().with_calendar(
        "work@example.com",
        "Work",
        "#fff",
        vec![timed("Standup", "2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z")],
    ).with_calendar(
        "other@example.com",
        "Other",
        "#000",
        vec![timed("Hidden", "2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z")],
    ));
    let provider = Arc::new(MockIdentityProvider::default());
    let pipeline = pipeline(source.clone(), provider, &["Work"], FailurePolicy::AllOrNothing);

    let week = pipeline.fetch_calendar_events(Some(test_window())).await;

    assert_eq!(week.day(0).len(), 1);
    let standup = &week.day(0)[0];
    assert_eq!(standup.summary, "Standup");
    assert_eq!(standup.start_label(), "09:00");
    assert_eq!(standup.end_label(), "10:00");
    assert_eq!(standup.location, "No location");
    assert_eq!(standup.color.as_deref(), Some("#fff"));
    for day in 1..7 {
        assert!(week.day(day).is_empty(), "day {} should be empty", day);
    }

    // Only the matching calendar is asked for events
    assert_eq!(source.event_calls.load(Ordering::SeqCst), 1);

    let json = serde_json::to_value(&week).unwrap();
    assert_eq!(
        json[0][0],
        serde_json::json!({
            "summary": "Standup",
            "start": "09:00",
            "end": "10:00",
            "allDay": false,
            "location": "No location",
            "color": "#fff"
        })
    );
    assert_eq!(json.as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_all_day_event_on_wednesday() {
    let source = Arc::new(MockCalendarSource::new().with_calendar(
        "work",
        "Work",
        "#fff",
        vec![all_day("Offsite", "2024-01-03", "2024-01-04")],
    ));
    let provider = Arc::new(MockIdentityProvider::default());
    let pipeline = pipeline(source, provider, &["Work"], FailurePolicy::AllOrNothing);

    let window = test_window();
    let monday = window.first_day();
    let week = pipeline.fetch_calendar_events(Some(window)).await;

    let offsite = &week.day(2)[0];
    assert_eq!(offsite.time, EventTime::AllDay);
    assert_eq!(offsite.start_label(), "NaN:NaN");
    assert_eq!(offsite.end_label(), "NaN:NaN");

    let days = build_week_view(week, monday);
    assert_eq!(days[2].name, "Wednesday");
    assert_eq!(days[2].events[0].time_label, "All day");
}

#[tokio::test]
async fn test_same_event_in_two_calendars_is_kept_twice() {
    let event = timed("X", "2024-01-04T15:00:00Z", "2024-01-04T16:00:00Z");
    let source = Arc::new(
        MockCalendarSource::new()
            .with_calendar("a", "Jobb", "#a00", vec![event.clone()])
            .with_calendar("b", "Privat", "#0a0", vec![event]),
    );
    let provider = Arc::new(MockIdentityProvider::default());
    let pipeline = pipeline(source, provider, &["Jobb", "Privat"], FailurePolicy::AllOrNothing);

    let week = pipeline.fetch_calendar_events(Some(test_window())).await;

    let thursday = week.day(3);
    assert_eq!(thursday.len(), 2);
    assert!(thursday.iter().all(|e| e.summary == "X"));
    let mut colors: Vec<_> = thursday.iter().filter_map(|e| e.color.clone()).collect();
    colors.sort();
    assert_eq!(colors, vec!["#0a0", "#a00"]);
}

#[tokio::test]
async fn test_one_failing_calendar_empties_the_week() {
    let source = Arc::new(
        MockCalendarSource::new()
            .with_calendar(
                "good",
                "Jobb",
                "#fff",
                vec![timed("Standup", "2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z")],
            )
            .with_calendar("bad", "Privat", "#000", vec![])
            .failing("bad"),
    );
    let provider = Arc::new(MockIdentityProvider::default());
    let pipeline = pipeline(source.clone(), provider, &["Jobb", "Privat"], FailurePolicy::AllOrNothing);

    let week = pipeline.fetch_calendar_events(Some(test_window())).await;
    assert!(week.is_empty());
    assert_eq!(week.days().len(), 7);

    // Siblings are not cancelled
    assert_eq!(source.event_calls.load(Ordering::SeqCst), 2);

    let err = pipeline.try_fetch(&test_window()).await.unwrap_err();
    assert!(err.is_fetch());
}

#[tokio::test]
async fn test_calendars_are_fetched_concurrently() {
    let inner = MockCalendarSource::new()
        .with_calendar(
            "a",
            "Jobb",
            "#a00",
            vec![timed("Standup", "2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z")],
        )
        .with_calendar("b", "Privat", "#0a0", vec![all_day("Offsite", "2024-01-03", "2024-01-04")])
        .with_calendar(
            "c",
            "Studier",
            "#00a",
            vec![timed("Lecture", "2024-01-05T13:00:00Z", "2024-01-05T15:00:00Z")],
        );
    let source = Arc::new(SlowCalendarSource::new(inner, Duration::from_millis(50)));
    let provider = Arc::new(MockIdentityProvider::default());
    let pipeline = CalendarPipeline::new(
        Arc::new(Session::new(provider)),
        source.clone(),
        settings(&["Jobb", "Privat", "Studier"], FailurePolicy::AllOrNothing),
    );

    let week = pipeline.try_fetch(&test_window()).await.unwrap();
    assert_eq!(week.len(), 3);

    // All three requests were open at the same time
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 3);
    assert_eq!(source.in_flight.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_skip_failed_keeps_other_calendars() {
    let source = Arc::new(
        MockCalendarSource::new()
            .with_calendar(
                "good",
                "Jobb",
                "#fff",
                vec![timed("Standup", "2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z")],
            )
            .with_calendar("bad", "Privat", "#000", vec![])
            .failing("bad"),
    );
    let provider = Arc::new(MockIdentityProvider::default());
    let pipeline = pipeline(source, provider, &["Jobb", "Privat"], FailurePolicy::SkipFailed);

    let week = pipeline.fetch_calendar_events(Some(test_window())).await;
    assert_eq!(week.len(), 1);
    assert_eq!(week.day(0)[0].summary, "Standup");
}

#[tokio::test]
async fn test_denied_sign_in_gives_empty_week() {
    let source = Arc::new(MockCalendarSource::new().with_calendar(
        "work",
        "Work",
        "#fff",
        vec![timed("Standup", "2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z")],
    ));
    let provider = Arc::new(MockIdentityProvider::denying());
    let pipeline = pipeline(source.clone(), provider.clone(), &["Work"], FailurePolicy::AllOrNothing);

    let week = pipeline.fetch_calendar_events(Some(test_window())).await;
    assert!(week.is_empty());
    assert_eq!(source.list_calls.load(Ordering::SeqCst), 0);

    // No automatic retry; the next fetch asks again
    let err = pipeline.try_fetch(&test_window()).await.unwrap_err();
    assert!(matches!(err, weektab::error::Error::Auth(_)));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_token_is_reused_between_fetches() {
    let source = Arc::new(MockCalendarSource::new().with_calendar("work", "Work", "#fff", vec![]));
    let provider = Arc::new(MockIdentityProvider::default());
    let pipeline = pipeline(source, provider.clone(), &["Work"], FailurePolicy::AllOrNothing);

    pipeline.fetch_calendar_events(Some(test_window())).await;
    pipeline.fetch_calendar_events(Some(test_window())).await;
    assert_eq!(provider.calls(), 1);
    assert_eq!(pipeline.session().cached_token().await.as_deref(), Some("token-0"));
}

#[tokio::test]
async fn test_unauthorized_response_clears_token() {
    let source = Arc::new(
        MockCalendarSource::new()
            .with_calendar(
                "work",
                "Work",
                "#fff",
                vec![timed("Standup", "2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z")],
            )
            .rejecting("token-0"),
    );
    let provider = Arc::new(MockIdentityProvider::default());
    let pipeline = pipeline(source, provider.clone(), &["Work"], FailurePolicy::AllOrNothing);

    let week = pipeline.fetch_calendar_events(Some(test_window())).await;
    assert!(week.is_empty());
    assert!(pipeline.session().cached_token().await.is_none());

    // A fresh token is requested and accepted
    let week = pipeline.fetch_calendar_events(Some(test_window())).await;
    assert_eq!(week.len(), 1);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_component_handle_fetch_and_sign_out() {
    let source = Arc::new(MockCalendarSource::new().with_calendar(
        "work",
        "Jobb",
        "#fff",
        vec![timed("Standup", "2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z")],
    ));
    let provider = Arc::new(MockIdentityProvider::default());
    let source_dyn: Arc<dyn CalendarSource> = source.clone();
    let provider_dyn: Arc<dyn IdentityProvider> = provider.clone();

    let config = Arc::new(RwLock::new(Config::default()));
    let mut manager = ComponentManager::new(Arc::clone(&config));
    manager.register(GoogleCalendar::with_parts(source_dyn, provider_dyn));
    manager.init_all().await.unwrap();

    let component = manager.get::<GoogleCalendar>().unwrap();
    let handle = component.get_handle().await.unwrap();

    let week = handle.fetch_calendar_events(Some(test_window())).await.unwrap();
    assert_eq!(week.day(0)[0].summary, "Standup");

    handle.sign_out().await.unwrap();
    handle.fetch_calendar_events(Some(test_window())).await.unwrap();
    assert_eq!(provider.calls(), 2);

    component.shutdown().await.unwrap();
}
