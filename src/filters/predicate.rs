//! Metadata filters evaluated against a candidate file before its content is read.

use super::date::{DateCondition, matches_date};
use super::size::{SizeCondition, SizeSystem, matches_size};
use crate::walker::is_hidden;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeFilter {
    pub system: SizeSystem,
    pub condition: SizeCondition,
    pub value1: f64,
    #[serde(default)]
    pub value2: f64,
    pub unit1: String,
    #[serde(default = "default_unit")]
    pub unit2: String,
}

fn default_unit() -> String {
    "Bytes".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFilter {
    pub condition: DateCondition,
    pub value1: DateTime<Local>,
    pub value2: DateTime<Local>,
}

impl DateFilter {
    fn matches(&self, timestamp: Option<DateTime<Local>>) -> bool {
        timestamp.is_some_and(|ts| matches_date(ts, self.condition, self.value1, self.value2))
    }
}

/// One enabled metadata filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterPredicate {
    Size(SizeFilter),
    CreationDate(DateFilter),
    ModificationDate(DateFilter),
    AccessDate(DateFilter),
    MimeType { allowed: HashSet<String> },
}

impl FilterPredicate {
    pub fn matches(&self, candidate: &FileCandidate) -> bool {
        match self {
            FilterPredicate::Size(f) => matches_size(
                candidate.size,
                f.system,
                f.condition,
                f.value1,
                f.value2,
                &f.unit1,
                &f.unit2,
            ),
            FilterPredicate::CreationDate(f) => f.matches(candidate.created),
            FilterPredicate::ModificationDate(f) => f.matches(candidate.modified),
            FilterPredicate::AccessDate(f) => f.matches(candidate.accessed),
            FilterPredicate::MimeType { allowed } => allowed.contains(&candidate.mime_type),
        }
    }

    /// True when the predicate reads the MIME type, which costs a file read to resolve.
    pub fn needs_mime_type(&self) -> bool {
        matches!(self, FilterPredicate::MimeType { .. })
    }

    /// Short label used in debug logs.
    pub fn name(&self) -> &'static str {
        match self {
            FilterPredicate::Size(_) => "size",
            FilterPredicate::CreationDate(_) => "creation date",
            FilterPredicate::ModificationDate(_) => "modification date",
            FilterPredicate::AccessDate(_) => "access date",
            FilterPredicate::MimeType { .. } => "mime type",
        }
    }
}

/// Returns the first predicate that rejects `candidate`, if any.
pub fn first_rejection<'a, I>(
    predicates: I,
    candidate: &FileCandidate,
) -> Option<&'a FilterPredicate>
where
    I: IntoIterator<Item = &'a FilterPredicate>,
{
    predicates.into_iter().find(|p| !p.matches(candidate))
}

pub fn matches_all(predicates: &[FilterPredicate], candidate: &FileCandidate) -> bool {
    predicates.iter().all(|p| p.matches(candidate))
}

/// Metadata resolved once per discovered file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub created: Option<DateTime<Local>>,
    pub modified: Option<DateTime<Local>>,
    pub accessed: Option<DateTime<Local>>,
    pub hidden: bool,
    pub mime_type: String,
}

impl FileCandidate {
    pub fn from_metadata(path: &Path, metadata: &Metadata, mime_type: String) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            created: local_time(metadata.created()),
            modified: local_time(metadata.modified()),
            accessed: local_time(metadata.accessed()),
            hidden: is_hidden(path, metadata),
            mime_type,
        }
    }
}

/// Converts a platform timestamp; unsupported fields become `None`.
pub fn local_time(time: std::io::Result<SystemTime>) -> Option<DateTime<Local>> {
    time.ok().map(DateTime::<Local>::from)
}
