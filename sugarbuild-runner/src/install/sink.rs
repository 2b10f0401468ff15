use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{error, info};

use super::ProgressObserver;
use crate::command::OutputSink;

/// How often a liveness line is logged once the final milestone is reached
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Routes install driver output into a [`ProgressObserver`]
///
/// Completed milestone labels are logged as they appear. After the final
/// milestone a heartbeat line is logged periodically until the driver
/// exits, since the last step can run for minutes without printing.
/// Any stderr output stops the driver.
pub struct InstallSink<'a> {
    observer: &'a mut dyn ProgressObserver,
    heartbeat: Option<JoinHandle<()>>,
    heartbeat_interval: Duration,
}

impl<'a> InstallSink<'a> {
    pub fn new(observer: &'a mut dyn ProgressObserver) -> Self {
        Self {
            observer,
            heartbeat: None,
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat.is_some()
    }

    fn start_heartbeat(&mut self) {
        let period = self.heartbeat_interval;
        self.heartbeat = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                info!("---- working...");
            }
        }));
    }
}

impl OutputSink for InstallSink<'_> {
    fn on_stdout(&mut self, chunk: &str) -> ControlFlow<String> {
        for label in self.observer.observe(chunk) {
            info!("-- {}", label);
        }

        if self.observer.is_finished() && self.heartbeat.is_none() {
            self.start_heartbeat();
        }

        ControlFlow::Continue(())
    }

    fn on_stderr(&mut self, chunk: &str) -> ControlFlow<String> {
        let message = chunk.trim();
        if message.is_empty() {
            return ControlFlow::Continue(());
        }

        error!("{}", message);
        ControlFlow::Break(message.to_string())
    }
}

impl Drop for InstallSink<'_> {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
    }
}
