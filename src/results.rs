//! Result rows, the sink the engine writes into, and in-place rescans.

use crate::controller::CancelToken;
use crate::error::Result;
use crate::file_types::{InferMimeResolver, MimeResolver};
use crate::filters::{FileCandidate, SizeSystem};
use crate::filters::predicate::local_time;
use crate::scanner::{ContentMatch, ScanLimits, scan};
use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

/// The content pattern exactly as it was compiled for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSnapshot {
    pub source: String,
    pub case_insensitive: bool,
}

impl PatternSnapshot {
    pub fn compile(&self) -> Result<Regex> {
        Ok(RegexBuilder::new(&self.source)
            .case_insensitive(self.case_insensitive)
            .build()?)
    }

    /// Option flags as persisted: `1` for case-insensitive, `0` otherwise.
    pub fn option_flags(&self) -> &'static str {
        if self.case_insensitive { "1" } else { "0" }
    }
}

/// One row of the result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: u64,
    pub checked: bool,
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub size_system: SizeSystem,
    pub mime_type: String,
    pub created: Option<DateTime<Local>>,
    pub modified: Option<DateTime<Local>>,
    pub accessed: Option<DateTime<Local>>,
    pub content: ContentMatch,
    pub pattern: PatternSnapshot,
    /// `false` when the row was produced in don't-match mode.
    pub match_text: bool,
}

/// Oldest and newest value seen for one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub oldest: DateTime<Local>,
    pub newest: DateTime<Local>,
}

impl TimeRange {
    fn widen(range: Option<Self>, time: Option<DateTime<Local>>) -> Option<Self> {
        match (range, time) {
            (Some(range), Some(time)) => Some(Self {
                oldest: range.oldest.min(time),
                newest: range.newest.max(time),
            }),
            (None, Some(time)) => Some(Self {
                oldest: time,
                newest: time,
            }),
            (range, None) => range,
        }
    }
}

/// Aggregates over a result set. Extremes are `None` when nothing contributed to them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultStatistics {
    pub files_found: usize,
    pub total_occurrences: usize,
    pub largest_occurrences: usize,
    pub total_size: u64,
    pub smallest_size: Option<u64>,
    pub biggest_size: Option<u64>,
    pub created: Option<TimeRange>,
    pub modified: Option<TimeRange>,
    pub accessed: Option<TimeRange>,
}

impl ResultStatistics {
    pub fn from_rows(rows: &[ResultRecord]) -> Self {
        rows.iter().fold(Self::default(), |mut stats, row| {
            let occurrences = row.content.occurrences;
            stats.files_found += 1;
            stats.total_occurrences += occurrences;
            stats.largest_occurrences = stats.largest_occurrences.max(occurrences);
            stats.total_size += row.size;
            stats.smallest_size = Some(stats.smallest_size.map_or(row.size, |s| s.min(row.size)));
            stats.biggest_size = Some(stats.biggest_size.map_or(row.size, |s| s.max(row.size)));
            stats.created = TimeRange::widen(stats.created, row.created);
            stats.modified = TimeRange::widen(stats.modified, row.modified);
            stats.accessed = TimeRange::widen(stats.accessed, row.accessed);
            stats
        })
    }
}

/// Receives results from a search run.
pub trait ResultSink {
    fn append_result(
        &mut self,
        candidate: &FileCandidate,
        content: ContentMatch,
        pattern: &PatternSnapshot,
        match_text: bool,
    );

    fn begin_reset(&mut self) {}

    fn end_reset(&mut self) {}
}

/// Notifications sent to an observer of a [`ResultsModel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    ResetStarted,
    ResetFinished,
    RowsAppended(usize),
    RowsRemoved(usize),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescanOptions {
    pub limits: ScanLimits,
    /// Overrides each row's own polarity when set.
    pub match_text: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescanSummary {
    pub rescanned: usize,
    pub removed: usize,
    pub canceled: bool,
}

/// In-memory result set.
pub struct ResultsModel {
    rows: Vec<ResultRecord>,
    next_id: u64,
    size_system: SizeSystem,
    observer: Option<Sender<ModelEvent>>,
    mime: Arc<dyn MimeResolver>,
}

impl std::fmt::Debug for ResultsModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultsModel")
            .field("rows", &self.rows.len())
            .field("next_id", &self.next_id)
            .field("size_system", &self.size_system)
            .finish()
    }
}

impl Default for ResultsModel {
    fn default() -> Self {
        Self::new(SizeSystem::default())
    }
}

impl ResultsModel {
    pub fn new(size_system: SizeSystem) -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
            size_system,
            observer: None,
            mime: Arc::new(InferMimeResolver::new()),
        }
    }

    pub fn with_observer(mut self, observer: Sender<ModelEvent>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_mime_resolver(mut self, resolver: Arc<dyn MimeResolver>) -> Self {
        self.mime = resolver;
        self
    }

    fn notify(&self, event: ModelEvent) {
        if let Some(tx) = &self.observer {
            let _ = tx.send(event);
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn size_system(&self) -> SizeSystem {
        self.size_system
    }

    /// Appends a row built from resolved metadata and returns its id.
    pub fn append_new(
        &mut self,
        candidate: &FileCandidate,
        content: ContentMatch,
        pattern: &PatternSnapshot,
        match_text: bool,
    ) -> u64 {
        let id = self.allocate_id();
        self.rows.push(ResultRecord {
            id,
            checked: false,
            path: candidate.path.clone(),
            name: candidate.name.clone(),
            size: candidate.size,
            size_system: self.size_system,
            mime_type: candidate.mime_type.clone(),
            created: candidate.created,
            modified: candidate.modified,
            accessed: candidate.accessed,
            content,
            pattern: pattern.clone(),
            match_text,
        });
        self.notify(ModelEvent::RowsAppended(1));
        id
    }

    /// Appends an existing record under a fresh id.
    pub fn push_record(&mut self, mut record: ResultRecord) -> u64 {
        let id = self.allocate_id();
        record.id = id;
        self.rows.push(record);
        self.notify(ModelEvent::RowsAppended(1));
        id
    }

    pub fn rows(&self) -> &[ResultRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ResultRecord> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn statistics(&self) -> ResultStatistics {
        ResultStatistics::from_rows(&self.rows)
    }

    pub fn get(&self, id: u64) -> Option<&ResultRecord> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn set_checked(&mut self, id: u64, checked: bool) -> bool {
        match self.rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.checked = checked;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        let removed = self.rows.len();
        self.rows.clear();
        if removed > 0 {
            self.notify(ModelEvent::RowsRemoved(removed));
        }
    }

    /// Removes every row for which `predicate` holds and returns how many went.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&ResultRecord) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| !predicate(row));
        let removed = before - self.rows.len();
        if removed > 0 {
            self.notify(ModelEvent::RowsRemoved(removed));
        }
        removed
    }

    /// Re-runs the content scan for every row, dropping rows that vanished or no
    /// longer satisfy their match polarity and refreshing the metadata of the rest.
    pub fn rescan(&mut self, options: &RescanOptions, cancel: &CancelToken) -> RescanSummary {
        let mut summary = RescanSummary::default();
        if self.rows.is_empty() {
            return summary;
        }

        self.begin_reset();
        let mut stale = vec![false; self.rows.len()];

        for (index, row) in self.rows.iter_mut().enumerate() {
            if cancel.is_canceled() {
                info!("Rescan canceled after {} rows", summary.rescanned);
                summary.canceled = true;
                break;
            }

            let metadata = match fs::metadata(&row.path) {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => {
                    debug!("{} is no longer a file", row.path.display());
                    stale[index] = true;
                    continue;
                }
            };
            let file = match File::open(&row.path) {
                Ok(file) => file,
                Err(e) => {
                    warn!("Cannot open file {}: {}", row.path.display(), e);
                    stale[index] = true;
                    continue;
                }
            };
            let pattern = match row.pattern.compile() {
                Ok(pattern) => pattern,
                Err(e) => {
                    warn!("Stored pattern for {} is invalid: {}", row.path.display(), e);
                    stale[index] = true;
                    continue;
                }
            };

            let mime_type = self.mime.resolve(&row.path);
            let found = scan(
                BufReader::new(file),
                &options.limits,
                &pattern,
                cancel,
                &row.path,
            );
            if cancel.is_canceled() {
                info!("Rescan canceled while reading {}", row.path.display());
                summary.canceled = true;
                break;
            }
            summary.rescanned += 1;

            let match_text = options.match_text.unwrap_or(row.match_text);
            let keep = (match_text && found.occurrences > 0)
                || (!match_text && found.occurrences == 0);
            if keep {
                row.content = found;
            } else {
                stale[index] = true;
            }

            row.size = metadata.len();
            row.mime_type = mime_type;
            row.created = local_time(metadata.created());
            row.modified = local_time(metadata.modified());
            row.accessed = local_time(metadata.accessed());
        }

        let before = self.rows.len();
        let mut flags = stale.into_iter();
        self.rows.retain(|_| !flags.next().unwrap_or(false));
        summary.removed = before - self.rows.len();
        if summary.removed > 0 {
            self.notify(ModelEvent::RowsRemoved(summary.removed));
        }

        self.end_reset();
        summary
    }
}

impl ResultSink for ResultsModel {
    fn append_result(
        &mut self,
        candidate: &FileCandidate,
        content: ContentMatch,
        pattern: &PatternSnapshot,
        match_text: bool,
    ) {
        self.append_new(candidate, content, pattern, match_text);
    }

    fn begin_reset(&mut self) {
        self.notify(ModelEvent::ResetStarted);
    }

    fn end_reset(&mut self) {
        self.notify(ModelEvent::ResetFinished);
    }
}
