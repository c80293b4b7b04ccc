//! The occurrence search engine: traversal, filtering, parsing and statistics.

use crate::controller::CancelToken;
use crate::error::Result;
use crate::file_types::{InferMimeResolver, MimeResolver, is_text_file};
use crate::filters::{FileCandidate, first_rejection};
use crate::hash::{Fingerprint, fingerprint_file};
use crate::request::{CompiledRequest, SearchRequest};
use crate::results::ResultSink;
use crate::scanner::scan;
use crate::walker::{DirectoryWalker, is_hidden};
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const OPERATION_PARSING: &str = "Parsing directories";
pub const OPERATION_SEARCHING: &str = "Searching occurrences";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub processed_directories: usize,
    pub processed_files: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Finished(Statistics),
    Canceled(Statistics),
}

impl SearchOutcome {
    pub fn statistics(&self) -> Statistics {
        match self {
            SearchOutcome::Finished(stats) | SearchOutcome::Canceled(stats) => *stats,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, SearchOutcome::Canceled(_))
    }
}

/// Progress notifications pushed from the worker. Sending never blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// The phase that just started.
    Operation(String),
    /// The directory or file currently being processed.
    Message(PathBuf),
    Finished(Statistics),
    Canceled(Statistics),
}

/// One search run over a [`SearchRequest`].
pub struct OccurrenceSearch {
    request: SearchRequest,
    compiled: CompiledRequest,
    events: Option<Sender<SearchEvent>>,
    cancel: CancelToken,
    mime: Arc<dyn MimeResolver>,
    seen: HashSet<Fingerprint>,
    stats: Statistics,
}

impl OccurrenceSearch {
    /// Compiles `request`; pattern errors surface here, before any file is touched.
    pub fn new(
        request: SearchRequest,
        events: Option<Sender<SearchEvent>>,
        cancel: CancelToken,
    ) -> Result<Self> {
        let compiled = request.compile()?;
        Ok(Self {
            request,
            compiled,
            events,
            cancel,
            mime: Arc::new(InferMimeResolver::new()),
            seen: HashSet::new(),
            stats: Statistics::default(),
        })
    }

    pub fn with_mime_resolver(mut self, resolver: Arc<dyn MimeResolver>) -> Self {
        self.mime = resolver;
        self
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    fn emit(&self, event: SearchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn conclude(&self) -> SearchOutcome {
        let outcome = if self.cancel.is_canceled() {
            info!("Search canceled: {:?}", self.stats);
            SearchOutcome::Canceled(self.stats)
        } else {
            info!("Search finished: {:?}", self.stats);
            SearchOutcome::Finished(self.stats)
        };
        self.emit(match outcome {
            SearchOutcome::Finished(stats) => SearchEvent::Finished(stats),
            SearchOutcome::Canceled(stats) => SearchEvent::Canceled(stats),
        });
        outcome
    }

    /// Runs every phase, appending qualifying files to `sink`.
    pub fn run(&mut self, sink: &mut dyn ResultSink) -> SearchOutcome {
        self.seen.clear();
        self.stats = Statistics::default();

        self.emit(SearchEvent::Operation(OPERATION_PARSING.to_string()));
        let mut files = {
            let mut walker = DirectoryWalker::new(
                &self.request.traversal,
                &self.compiled.exclude_dirs,
                self.request.limits.max_files,
                &self.cancel,
            )
            .with_events(self.events.clone());
            let files = walker.collect(&self.compiled.roots);
            self.stats.processed_directories = walker.processed_directories();
            self.stats.processed_files = files.len();
            files
        };
        debug!("Collected {} candidate files", files.len());

        if self.cancel.is_canceled() {
            return self.conclude();
        }

        files.sort();

        self.emit(SearchEvent::Operation(OPERATION_SEARCHING.to_string()));
        for path in &files {
            if self.cancel.is_canceled() {
                break;
            }
            self.filter_file(path, sink);
        }

        self.conclude()
    }

    fn filter_file(&mut self, path: &Path, sink: &mut dyn ResultSink) {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Cannot read metadata of {}: {}", path.display(), e);
                return;
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if !self.compiled.filename.matches(&name) {
            debug!("{} rejected by file name pattern", path.display());
            return;
        }

        if self.request.traversal.ignore_hidden_files && is_hidden(path, &metadata) {
            debug!("{} is hidden", path.display());
            return;
        }

        let mut candidate = FileCandidate::from_metadata(path, &metadata, String::new());
        let filters = &self.request.filters;
        let metadata_filters = filters.iter().filter(|f| !f.needs_mime_type());
        if let Some(rejected) = first_rejection(metadata_filters, &candidate) {
            debug!("{} rejected by {} filter", path.display(), rejected.name());
            return;
        }

        candidate.mime_type = self.mime.resolve(path);
        let mime_filters = filters.iter().filter(|f| f.needs_mime_type());
        if let Some(rejected) = first_rejection(mime_filters, &candidate) {
            debug!("{} rejected by {} filter", path.display(), rejected.name());
            return;
        }

        self.parse_file(&candidate, sink);
    }

    fn parse_file(&mut self, candidate: &FileCandidate, sink: &mut dyn ResultSink) {
        let path = &candidate.path;
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Cannot open file {}: {}", path.display(), e);
                return;
            }
        };

        if self.request.ignore_unparseable {
            match is_text_file(&mut file) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Skipping unparseable file {}", path.display());
                    return;
                }
                Err(e) => {
                    warn!("Cannot sniff {}: {}", path.display(), e);
                    return;
                }
            }
        }

        if self.request.avoid_duplicates {
            match fingerprint_file(&mut file) {
                Ok(fingerprint) => {
                    if !self.seen.insert(fingerprint) {
                        debug!("Skipping duplicate {} ({})", path.display(), fingerprint);
                        return;
                    }
                }
                Err(e) => {
                    warn!("Cannot hash {}: {}", path.display(), e);
                    return;
                }
            }
        }

        self.emit(SearchEvent::Message(path.clone()));
        let found = scan(
            BufReader::new(file),
            &self.compiled.scan_limits,
            &self.compiled.content,
            &self.cancel,
            path,
        );
        if self.cancel.is_canceled() {
            debug!("Dropping partial scan of {}", path.display());
            return;
        }

        let match_text = self.request.content.match_text();
        let should_append =
            (match_text && found.occurrences > 0) || (!match_text && found.occurrences == 0);
        if should_append {
            sink.append_result(candidate, found, &self.compiled.snapshot, match_text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::ResultsModel;
    use tempfile::tempdir;

    fn request_for(dir: &Path, pattern: &str) -> SearchRequest {
        let mut request = SearchRequest::new(pattern).with_include_dirs([dir]);
        request.traversal.subdirectories = true;
        request
    }

    fn run(request: SearchRequest) -> (SearchOutcome, ResultsModel) {
        let mut search = OccurrenceSearch::new(request, None, CancelToken::new()).unwrap();
        let mut model = ResultsModel::default();
        let outcome = search.run(&mut model);
        (outcome, model)
    }

    fn names(model: &ResultsModel) -> Vec<&str> {
        model.rows().iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_finds_matching_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo").unwrap();
        fs::write(dir.path().join("b.txt"), "bar").unwrap();

        let (outcome, model) = run(request_for(dir.path(), "foo"));
        assert_eq!(
            outcome,
            SearchOutcome::Finished(Statistics {
                processed_directories: 1,
                processed_files: 2
            })
        );
        assert_eq!(names(&model), vec!["a.txt"]);
        assert_eq!(model.rows()[0].content.occurrences, 1);
        assert_eq!(model.rows()[0].content.lines_joined(), "1");
        assert!(model.rows()[0].match_text);
    }

    #[test]
    fn test_dont_match_mode_reports_files_without_occurrences() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo").unwrap();
        fs::write(dir.path().join("b.txt"), "bar").unwrap();

        let mut request = request_for(dir.path(), "foo");
        request.content.dont_match = true;
        let (_, model) = run(request);
        assert_eq!(names(&model), vec!["b.txt"]);
        assert!(!model.rows()[0].match_text);
    }

    #[test]
    fn test_filename_pattern_and_hidden_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("keep.log"), "foo").unwrap();
        fs::write(dir.path().join("skip.txt"), "foo").unwrap();
        fs::write(dir.path().join(".hidden.log"), "foo").unwrap();

        let mut request = request_for(dir.path(), "foo");
        request.filename.text = "*.log".to_string();
        request.filename.syntax = crate::filters::PatternSyntax::Wildcard;
        let (_, model) = run(request.clone());
        assert_eq!(names(&model), vec![".hidden.log", "keep.log"]);

        request.traversal.ignore_hidden_files = true;
        let (_, model) = run(request);
        assert_eq!(names(&model), vec!["keep.log"]);
    }

    #[test]
    fn test_unparseable_files_are_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("text.txt"), "foo").unwrap();
        fs::write(dir.path().join("bin.dat"), b"foo\0\x01\x02").unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();

        let mut request = request_for(dir.path(), "foo");
        let (_, model) = run(request.clone());
        assert_eq!(names(&model), vec!["bin.dat", "text.txt"]);

        request.ignore_unparseable = true;
        let (_, model) = run(request);
        assert_eq!(names(&model), vec!["text.txt"]);
    }

    #[test]
    fn test_duplicates_keep_first_in_sorted_order() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("z")).unwrap();
        fs::write(dir.path().join("z/copy.txt"), "same foo").unwrap();
        fs::write(dir.path().join("orig.txt"), "same foo").unwrap();
        fs::write(dir.path().join("other.txt"), "other foo").unwrap();

        let mut request = request_for(dir.path(), "foo");
        request.avoid_duplicates = true;
        let mut search = OccurrenceSearch::new(request, None, CancelToken::new()).unwrap();

        let mut model = ResultsModel::default();
        search.run(&mut model);
        assert_eq!(names(&model), vec!["orig.txt", "other.txt"]);

        // The seen set is reset for every run.
        let mut again = ResultsModel::default();
        search.run(&mut again);
        assert_eq!(again.len(), 2);
    }

    #[test]
    fn test_mime_filter() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "foo").unwrap();
        fs::write(dir.path().join("data.json"), "{\"foo\": 1}").unwrap();

        let request = request_for(dir.path(), "foo").with_mime_types(["application/json"]);
        let (_, model) = run(request);
        assert_eq!(names(&model), vec!["data.json"]);
        assert_eq!(model.rows()[0].mime_type, "application/json");
    }

    #[test]
    fn test_canceled_before_start() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo").unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut search =
            OccurrenceSearch::new(request_for(dir.path(), "foo"), Some(tx), cancel).unwrap();
        let mut model = ResultsModel::default();
        let outcome = search.run(&mut model);

        assert!(outcome.is_canceled());
        assert_eq!(outcome.statistics(), Statistics::default());
        assert!(model.is_empty());
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.last(), Some(&SearchEvent::Canceled(Statistics::default())));
    }

    /// Cancels the run the first time a MIME type is asked for.
    struct CancelOnResolve(CancelToken);

    impl MimeResolver for CancelOnResolve {
        fn resolve(&self, _path: &Path) -> String {
            self.0.cancel();
            "text/plain".to_string()
        }
    }

    /// Counts resolutions.
    #[derive(Default)]
    struct CountingResolver(std::sync::atomic::AtomicUsize);

    impl MimeResolver for CountingResolver {
        fn resolve(&self, _path: &Path) -> String {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            "text/plain".to_string()
        }
    }

    #[test]
    fn test_partial_scan_is_not_reported() {
        let dir = tempdir().unwrap();
        let mut content = "filler\n".repeat(150);
        content.push_str("foo\n");
        fs::write(dir.path().join("late.txt"), content).unwrap();

        let mut request = request_for(dir.path(), "foo");
        request.content.dont_match = true;
        let cancel = CancelToken::new();
        let mut search = OccurrenceSearch::new(request, None, cancel.clone())
            .unwrap()
            .with_mime_resolver(Arc::new(CancelOnResolve(cancel)));

        let mut model = ResultsModel::default();
        let outcome = search.run(&mut model);
        assert!(outcome.is_canceled());
        assert!(model.is_empty());
    }

    #[test]
    fn test_mime_resolved_after_metadata_filters() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("small.txt"), "foo").unwrap();
        fs::write(dir.path().join("large.txt"), format!("foo{}", " ".repeat(100))).unwrap();

        use crate::filters::{FilterPredicate, SizeCondition, SizeFilter, SizeSystem};

        let mut request = request_for(dir.path(), "foo");
        request.filters.push(FilterPredicate::Size(SizeFilter {
            system: SizeSystem::Si,
            condition: SizeCondition::GreaterThan,
            value1: 50.0,
            value2: 0.0,
            unit1: "Bytes".to_string(),
            unit2: "Bytes".to_string(),
        }));
        let resolver = Arc::new(CountingResolver::default());
        let mut search = OccurrenceSearch::new(request, None, CancelToken::new())
            .unwrap()
            .with_mime_resolver(resolver.clone());

        let mut model = ResultsModel::default();
        search.run(&mut model);
        assert_eq!(names(&model), vec!["large.txt"]);
        assert_eq!(resolver.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_events_sequence() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "foo").unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut search =
            OccurrenceSearch::new(request_for(dir.path(), "foo"), Some(tx), CancelToken::new())
                .unwrap();
        search.run(&mut ResultsModel::default());

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events[0], SearchEvent::Operation(OPERATION_PARSING.to_string()));
        assert!(events.contains(&SearchEvent::Operation(OPERATION_SEARCHING.to_string())));
        assert!(events.contains(&SearchEvent::Message(dir.path().join("a.txt"))));
        assert!(matches!(events.last(), Some(SearchEvent::Finished(_))));
    }
}
