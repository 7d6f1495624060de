use crate::config::Config;
use crate::error::{component_error, TabResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const TICK: Duration = Duration::from_secs(1);

/// Wall clock text shown on the page
pub fn clock_text(now: DateTime<Tz>) -> String {
    now.format("%H:%M:%S").to_string()
}

/// Publishes the current time once per second
pub struct Clock {
    sender: watch::Sender<String>,
    cancel: CancellationToken,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(String::new());
        Self {
            sender,
            cancel: CancellationToken::new(),
        }
    }

    /// Receiver always holding the latest clock text
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.sender.subscribe()
    }

    fn start(&self, tz: Tz) {
        self.sender.send_replace(clock_text(Utc::now().with_timezone(&tz)));

        let sender = self.sender.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut ticker = interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Clock ticker stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        sender.send_replace(clock_text(Utc::now().with_timezone(&tz)));
                    }
                }
            }
        });
    }
}

#[async_trait]
impl super::Component for Clock {
    fn name(&self) -> &'static str {
        "clock"
    }

    async fn init(&self, config: Arc<RwLock<Config>>) -> TabResult<()> {
        if self.cancel.is_cancelled() {
            return Err(component_error("Clock was already shut down"));
        }
        let tz = config.read().await.timezone()?;
        info!("Starting clock in {}", tz);
        self.start(tz);
        Ok(())
    }

    async fn shutdown(&self) -> TabResult<()> {
        self.cancel.cancel();
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
