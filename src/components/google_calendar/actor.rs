use super::models::WeekBuckets;
use super::pipeline::CalendarPipeline;
use super::time::WeekWindow;
use crate::error::{component_error, TabResult};
use tokio::sync::{mpsc, oneshot};
use tracing::info;

/// The calendar actor; runs one fetch at a time
pub struct GoogleCalendarActor {
    pipeline: CalendarPipeline,
    command_rx: mpsc::Receiver<GoogleCalendarCommand>,
}

/// Commands that can be sent to the calendar actor
pub enum GoogleCalendarCommand {
    FetchWeek {
        window: Option<WeekWindow>,
        response_tx: oneshot::Sender<WeekBuckets>,
    },
    TryFetchWeek {
        window: WeekWindow,
        response_tx: oneshot::Sender<TabResult<WeekBuckets>>,
    },
    SignOut(oneshot::Sender<()>),
    Shutdown,
}

/// Sending side of the actor mailbox
#[derive(Clone)]
pub struct GoogleCalendarActorHandle {
    command_tx: mpsc::Sender<GoogleCalendarCommand>,
}

impl GoogleCalendarActorHandle {
    async fn send(&self, command: GoogleCalendarCommand) -> TabResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))
    }

    /// Week of events; empty when anything fails
    pub async fn fetch_week(&self, window: Option<WeekWindow>) -> TabResult<WeekBuckets> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(GoogleCalendarCommand::FetchWeek { window, response_tx })
            .await?;
        response_rx
            .await
            .map_err(|_| component_error("Response channel closed"))
    }

    /// Week of events with the failure passed back
    pub async fn try_fetch_week(&self, window: WeekWindow) -> TabResult<WeekBuckets> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(GoogleCalendarCommand::TryFetchWeek { window, response_tx })
            .await?;
        response_rx
            .await
            .map_err(|_| component_error("Response channel closed"))?
    }

    pub async fn sign_out(&self) -> TabResult<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(GoogleCalendarCommand::SignOut(response_tx)).await?;
        response_rx
            .await
            .map_err(|_| component_error("Response channel closed"))
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> TabResult<()> {
        let _ = self.command_tx.send(GoogleCalendarCommand::Shutdown).await;
        Ok(())
    }
}

impl GoogleCalendarActor {
    /// Create a new actor and return its handle
    pub fn new(pipeline: CalendarPipeline) -> (Self, GoogleCalendarActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let actor = Self {
            pipeline,
            command_rx,
        };
        (actor, GoogleCalendarActorHandle { command_tx })
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Google Calendar actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                GoogleCalendarCommand::FetchWeek { window, response_tx } => {
                    let week = self.pipeline.fetch_calendar_events(window).await;
                    let _ = response_tx.send(week);
                }
                GoogleCalendarCommand::TryFetchWeek { window, response_tx } => {
                    let result = self.pipeline.try_fetch(&window).await;
                    let _ = response_tx.send(result);
                }
                GoogleCalendarCommand::SignOut(response_tx) => {
                    self.pipeline.session().sign_out().await;
                    let _ = response_tx.send(());
                }
                GoogleCalendarCommand::Shutdown => {
                    info!("Google Calendar actor shutting down");
                    break;
                }
            }
        }

        info!("Google Calendar actor shut down");
    }
}
