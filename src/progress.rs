use crate::error::{Result, RfseekError};
use crate::search::{SearchEvent, Statistics};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spinner fed by engine status events. Hidden when not attached to a terminal.
pub struct SearchProgress {
    bar: Option<ProgressBar>,
    operation: String,
    messages_seen: u64,
}

impl SearchProgress {
    pub fn new(enabled: bool) -> Result<Self> {
        let bar = if enabled {
            let style = ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .map_err(|e| RfseekError::Other(e.to_string()))?
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
            let bar = ProgressBar::new_spinner().with_style(style);
            bar.enable_steady_tick(POLL_INTERVAL);
            Some(bar)
        } else {
            None
        };

        Ok(Self {
            bar,
            operation: String::new(),
            messages_seen: 0,
        })
    }

    pub fn messages_seen(&self) -> u64 {
        self.messages_seen
    }

    /// Applies one event; returns the statistics once the run has ended.
    pub fn handle(&mut self, event: &SearchEvent) -> Option<Statistics> {
        match event {
            SearchEvent::Operation(operation) => {
                self.operation = operation.clone();
                self.set_message(operation.clone());
                None
            }
            SearchEvent::Message(path) => {
                self.messages_seen += 1;
                let message = format!("{}: {}", self.operation, path.display());
                self.set_message(message);
                None
            }
            SearchEvent::Finished(stats) | SearchEvent::Canceled(stats) => {
                self.finish();
                Some(*stats)
            }
        }
    }

    fn set_message(&self, message: String) {
        if let Some(bar) = &self.bar {
            bar.set_message(message);
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Drains `events` until the run reports its end or `still_running` turns false.
pub fn follow_events<F>(
    events: &Receiver<SearchEvent>,
    progress: &mut SearchProgress,
    still_running: F,
) -> Option<Statistics>
where
    F: Fn() -> bool,
{
    loop {
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                if let Some(stats) = progress.handle(&event) {
                    return Some(stats);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !still_running() {
                    progress.finish();
                    return None;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                progress.finish();
                return None;
            }
        }
    }
}
