//! Runs searches on a dedicated worker thread, one at a time.

use crate::error::{Result, RfseekError};
use crate::filters::SizeSystem;
use crate::request::SearchRequest;
use crate::results::ResultsModel;
use crate::search::{OccurrenceSearch, SearchEvent, SearchOutcome};
use chrono::{DateTime, Local};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shared cancellation flag polled by the worker at its checkpoints.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Wall-clock bounds of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunTiming {
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
}

impl RunTiming {
    pub fn elapsed(&self) -> Duration {
        (self.finished - self.started).to_std().unwrap_or_default()
    }
}

/// What a finished worker hands back when joined.
#[derive(Debug)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    pub results: ResultsModel,
    pub timing: RunTiming,
}

struct ActiveRun {
    cancel: CancelToken,
    handle: JoinHandle<SearchReport>,
}

/// Owns the worker thread and the event channel shared by successive runs.
pub struct SearchController {
    events_tx: Sender<SearchEvent>,
    events_rx: Receiver<SearchEvent>,
    size_system: SizeSystem,
    active: Option<ActiveRun>,
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchController {
    pub fn new() -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            events_tx,
            events_rx,
            size_system: SizeSystem::default(),
            active: None,
        }
    }

    /// Size system recorded on every result row.
    pub fn with_size_system(mut self, size_system: SizeSystem) -> Self {
        self.size_system = size_system;
        self
    }

    pub fn events(&self) -> Receiver<SearchEvent> {
        self.events_rx.clone()
    }

    /// Starts a run for `request`.
    ///
    /// The request is compiled before anything else, so an invalid one leaves a run
    /// in flight untouched. Otherwise that run is canceled and joined first and its
    /// report is returned.
    pub fn start(&mut self, request: SearchRequest) -> Result<Option<SearchReport>> {
        let cancel = CancelToken::new();
        let mut search =
            OccurrenceSearch::new(request, Some(self.events_tx.clone()), cancel.clone())?;
        let size_system = self.size_system;

        let replaced = self.cancel_and_join()?;

        let handle = thread::Builder::new()
            .name("rfseek-search".to_string())
            .spawn(move || {
                let started = Local::now();
                let mut results = ResultsModel::new(size_system);
                let outcome = search.run(&mut results);
                SearchReport {
                    outcome,
                    results,
                    timing: RunTiming {
                        started,
                        finished: Local::now(),
                    },
                }
            })?;

        info!("Search started");
        self.active = Some(ActiveRun { cancel, handle });
        Ok(replaced)
    }

    /// Token of the current run, if any.
    pub fn cancel_token(&self) -> Option<CancelToken> {
        self.active.as_ref().map(|run| run.cancel.clone())
    }

    /// Requests cancellation; the worker stops at its next checkpoint.
    pub fn cancel(&self) {
        if let Some(run) = &self.active {
            debug!("Cancellation requested");
            run.cancel.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    /// Blocks until the current run ends and returns its report.
    pub fn wait(&mut self) -> Result<Option<SearchReport>> {
        match self.active.take() {
            Some(run) => join(run).map(Some),
            None => Ok(None),
        }
    }

    fn cancel_and_join(&mut self) -> Result<Option<SearchReport>> {
        match self.active.take() {
            Some(run) => {
                info!("Canceling the running search before starting a new one");
                run.cancel.cancel();
                join(run).map(Some)
            }
            None => Ok(None),
        }
    }
}

fn join(run: ActiveRun) -> Result<SearchReport> {
    run.handle
        .join()
        .map_err(|_| RfseekError::Other("search worker panicked".to_string()))
}

impl Drop for SearchController {
    fn drop(&mut self) {
        if let Some(run) = self.active.take() {
            run.cancel.cancel();
            let _ = run.handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Statistics;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_canceled());
        token.cancel();
        assert!(clone.is_canceled());
        clone.reset();
        assert!(!token.is_canceled());
    }

    #[test]
    fn test_run_and_wait() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo\nfoo").unwrap();

        let mut controller = SearchController::new().with_size_system(SizeSystem::Iec);
        let events = controller.events();
        let replaced = controller
            .start(SearchRequest::new("foo").with_include_dirs([dir.path()]))
            .unwrap();
        assert!(replaced.is_none());

        let report = controller.wait().unwrap().unwrap();
        assert_eq!(
            report.outcome,
            SearchOutcome::Finished(Statistics {
                processed_directories: 1,
                processed_files: 1
            })
        );
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results.rows()[0].size_system, SizeSystem::Iec);
        assert!(report.timing.started <= report.timing.finished);
        assert_eq!(report.results.statistics().total_occurrences, 2);
        assert!(!controller.is_running());
        assert!(controller.wait().unwrap().is_none());

        let received: Vec<_> = events.try_iter().collect();
        assert!(matches!(received.last(), Some(SearchEvent::Finished(_))));
    }

    #[test]
    fn test_restart_joins_previous_run() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo").unwrap();

        let mut controller = SearchController::new();
        let request = SearchRequest::new("foo").with_include_dirs([dir.path()]);
        controller.start(request.clone()).unwrap();
        let replaced = controller.start(request).unwrap();
        assert!(replaced.is_some());

        let report = controller.wait().unwrap().unwrap();
        assert!(!report.outcome.is_canceled());
        assert_eq!(report.results.len(), 1);
    }

    #[test]
    fn test_invalid_request_does_not_spawn() {
        let mut request = SearchRequest::new("(").with_include_dirs(["/tmp"]);
        request.content.syntax = crate::filters::PatternSyntax::RegularExpression;
        let mut controller = SearchController::new();
        assert!(controller.start(request).is_err());
        assert!(controller.cancel_token().is_none());
    }

    #[test]
    fn test_invalid_request_keeps_active_run() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo").unwrap();

        let mut controller = SearchController::new();
        controller
            .start(SearchRequest::new("foo").with_include_dirs([dir.path()]))
            .unwrap();
        let token = controller.cancel_token().unwrap();

        let mut invalid = SearchRequest::new("(").with_include_dirs([dir.path()]);
        invalid.content.syntax = crate::filters::PatternSyntax::RegularExpression;
        assert!(controller.start(invalid).is_err());
        assert!(!token.is_canceled());

        let report = controller.wait().unwrap().unwrap();
        assert!(!report.outcome.is_canceled());
        assert_eq!(report.results.len(), 1);
    }
}
