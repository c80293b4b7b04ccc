//! Search request model and its compiled, ready-to-run form.

use crate::error::{Result, RfseekError};
use crate::filters::{FilenameMatcher, FilenamePattern, FilterPredicate, PatternSyntax};
use crate::hash::{HashContentType, hash_content_key};
use crate::results::PatternSnapshot;
use crate::scanner::ScanLimits;
use crate::walker::normalize_roots;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalOptions {
    pub subdirectories: bool,
    pub min_depth: usize,
    /// `None` means unlimited.
    pub max_depth: Option<usize>,
    pub ignore_hidden_dirs: bool,
    pub ignore_hidden_files: bool,
    pub ignore_symlink_dirs: bool,
    pub ignore_symlink_files: bool,
}

/// The text searched for inside files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPattern {
    pub text: String,
    pub syntax: PatternSyntax,
    pub case_sensitive: bool,
    pub whole_words: bool,
    /// Report files with zero occurrences instead of files with some.
    pub dont_match: bool,
}

impl ContentPattern {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Regex source after syntax translation and word boundaries.
    pub fn source(&self) -> String {
        let translated = self.syntax.translate(&self.text);
        if self.whole_words {
            format!(r"\b(?:{translated})\b")
        } else {
            translated
        }
    }

    pub fn snapshot(&self) -> PatternSnapshot {
        PatternSnapshot {
            source: self.source(),
            case_insensitive: !self.case_sensitive,
        }
    }

    pub fn match_text(&self) -> bool {
        !self.dont_match
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    pub timeout_secs: Option<u64>,
    pub max_files: Option<usize>,
    pub max_occurrences: Option<usize>,
}

impl SearchLimits {
    pub fn scan_limits(&self) -> ScanLimits {
        ScanLimits {
            timeout: self.timeout_secs.map(Duration::from_secs),
            max_occurrences: self.max_occurrences,
        }
    }
}

/// Set of strings deduplicated by their MurmurHash3 key.
#[derive(Debug, Clone)]
pub struct KeyedSet {
    kind: HashContentType,
    keys: HashSet<String>,
    items: Vec<String>,
}

impl KeyedSet {
    pub fn new(kind: HashContentType) -> Self {
        Self {
            kind,
            keys: HashSet::new(),
            items: Vec::new(),
        }
    }

    /// Adds `item` unless an equal entry is present; returns whether it was added.
    pub fn insert(&mut self, item: &str) -> bool {
        let item = item.trim();
        if item.is_empty() {
            return false;
        }
        if !self.keys.insert(hash_content_key(item, self.kind)) {
            return false;
        }
        self.items.push(item.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<String> {
        self.items
    }
}

/// Everything one search run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub include_dirs: Vec<PathBuf>,
    pub exclude_dirs: Vec<PathBuf>,
    pub traversal: TraversalOptions,
    pub filename: FilenamePattern,
    pub content: ContentPattern,
    pub filters: Vec<FilterPredicate>,
    pub ignore_unparseable: bool,
    pub avoid_duplicates: bool,
    pub limits: SearchLimits,
}

impl SearchRequest {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            content: ContentPattern::new(pattern),
            ..Default::default()
        }
    }

    /// Adds include directories, skipping duplicates.
    pub fn with_include_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.include_dirs = merge_dirs(&self.include_dirs, dirs);
        self
    }

    pub fn with_exclude_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.exclude_dirs = merge_dirs(&self.exclude_dirs, dirs);
        self
    }

    /// Adds a MIME allow-list filter built from `names`, skipping duplicates.
    pub fn with_mime_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = KeyedSet::new(HashContentType::MimeType);
        for name in names {
            set.insert(name.as_ref());
        }
        if !set.is_empty() {
            self.filters.push(FilterPredicate::MimeType {
                allowed: set.into_items().into_iter().collect(),
            });
        }
        self
    }

    /// Checks the preconditions the engine itself does not verify.
    pub fn validate(&self) -> Result<()> {
        if self.include_dirs.is_empty() {
            return Err(RfseekError::InvalidRequest(
                "at least one directory to search is required".to_string(),
            ));
        }
        if let Some(max) = self.traversal.max_depth {
            if self.traversal.min_depth > max {
                return Err(RfseekError::InvalidRequest(format!(
                    "minimum depth {} is greater than maximum depth {}",
                    self.traversal.min_depth, max
                )));
            }
        }
        Ok(())
    }

    /// Compiles patterns and normalises directories.
    pub fn compile(&self) -> Result<CompiledRequest> {
        let snapshot = self.content.snapshot();
        let content = snapshot.compile()?;
        let filename = FilenameMatcher::new(&self.filename)?;

        let include: Vec<PathBuf> = self
            .include_dirs
            .iter()
            .map(|p| absolute(p))
            .collect::<Result<_>>()?;
        let roots = normalize_roots(&include, self.traversal.subdirectories);
        let exclude_dirs = self
            .exclude_dirs
            .iter()
            .map(|p| absolute(p))
            .collect::<Result<_>>()?;

        Ok(CompiledRequest {
            roots,
            exclude_dirs,
            content,
            snapshot,
            filename,
            scan_limits: self.limits.scan_limits(),
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

fn merge_dirs<I, P>(existing: &[PathBuf], extra: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut set = KeyedSet::new(HashContentType::DirectoryPath);
    let mut merged = Vec::new();
    let candidates = existing
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .chain(
            extra
                .into_iter()
                .map(|p| p.as_ref().to_string_lossy().into_owned()),
        );
    for dir in candidates {
        let trimmed = dir.trim_end_matches(['/', '\\']);
        let key = if trimmed.is_empty() { dir.as_str() } else { trimmed };
        if set.insert(key) {
            merged.push(PathBuf::from(key));
        }
    }
    merged
}

/// A request with its patterns compiled and its directories made absolute.
#[derive(Debug, Clone)]
pub struct CompiledRequest {
    pub roots: Vec<PathBuf>,
    pub exclude_dirs: Vec<PathBuf>,
    pub content: Regex,
    pub snapshot: PatternSnapshot,
    pub filename: FilenameMatcher,
    pub scan_limits: ScanLimits,
}
