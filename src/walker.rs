//! Directory traversal: root normalisation and bounded recursive collection of files.

use crate::controller::CancelToken;
use crate::request::TraversalOptions;
use crate::search::SearchEvent;
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Hard recursion cap applied even when the maximum depth is unlimited.
pub const MAX_TRAVERSAL_DEPTH: usize = 512;

/// Sorts and dedups `roots`; when `recursive`, drops every root nested inside another.
pub fn normalize_roots(roots: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut sorted = roots.to_vec();
    sorted.sort();
    sorted.dedup();

    if !recursive {
        return sorted;
    }

    let mut kept: Vec<PathBuf> = Vec::with_capacity(sorted.len());
    for dir in sorted {
        if kept.iter().any(|parent| dir.starts_with(parent)) {
            debug!("Dropping nested root {}", dir.display());
            continue;
        }
        kept.push(dir);
    }
    kept
}

fn has_dot_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n != "." && n != "..")
}

#[cfg(windows)]
pub fn is_hidden(path: &Path, metadata: &Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0 || has_dot_name(path)
}

#[cfg(not(windows))]
pub fn is_hidden(path: &Path, _metadata: &Metadata) -> bool {
    has_dot_name(path)
}

/// Collects candidate files below a set of roots.
pub struct DirectoryWalker<'a> {
    options: &'a TraversalOptions,
    exclude_dirs: Vec<String>,
    max_files: Option<usize>,
    cancel: &'a CancelToken,
    events: Option<Sender<SearchEvent>>,
    files: Vec<PathBuf>,
    processed_directories: usize,
    /// Canonical paths of the directories on the current branch.
    ancestors: Vec<PathBuf>,
}

impl<'a> DirectoryWalker<'a> {
    pub fn new(
        options: &'a TraversalOptions,
        exclude_dirs: &[PathBuf],
        max_files: Option<usize>,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            options,
            exclude_dirs: exclude_dirs
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            max_files,
            cancel,
            events: None,
            files: Vec::new(),
            processed_directories: 0,
            ancestors: Vec::new(),
        }
    }

    /// Reports every visited directory on `events`.
    pub fn with_events(mut self, events: Option<Sender<SearchEvent>>) -> Self {
        self.events = events;
        self
    }

    pub fn processed_directories(&self) -> usize {
        self.processed_directories
    }

    pub fn processed_files(&self) -> usize {
        self.files.len()
    }

    /// Walks every root in order and returns the collected files in discovery order.
    pub fn collect(&mut self, roots: &[PathBuf]) -> Vec<PathBuf> {
        for root in roots {
            if self.cancel.is_canceled() {
                break;
            }
            self.parse_directory(root, 0);
        }
        std::mem::take(&mut self.files)
    }

    fn limit_reached(&self) -> bool {
        self.max_files.is_some_and(|max| self.files.len() >= max)
    }

    fn is_excluded(&self, dir: &Path) -> bool {
        let dir = dir.to_string_lossy();
        self.exclude_dirs.iter().any(|prefix| dir.starts_with(prefix.as_str()))
    }

    fn notify(&self, dir: &Path) {
        if let Some(tx) = &self.events {
            let _ = tx.send(SearchEvent::Message(dir.to_path_buf()));
        }
    }

    fn parse_directory(&mut self, dir: &Path, depth: usize) {
        if self.cancel.is_canceled() {
            return;
        }
        if self.limit_reached() {
            info!("File limit reached. Stopping further parsing.");
            return;
        }
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        if depth > MAX_TRAVERSAL_DEPTH {
            warn!(
                "Maximum traversal depth {} exceeded at {}",
                MAX_TRAVERSAL_DEPTH,
                dir.display()
            );
            return;
        }
        if let Err(e) = fs::read_dir(dir) {
            warn!(
                "Directory is not readable or does not exist: {} ({})",
                dir.display(),
                e
            );
            return;
        }

        let canonical = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        if self.ancestors.contains(&canonical) {
            warn!("Symbolic link loop detected at {}", dir.display());
            return;
        }

        self.notify(dir);
        let (files, subdirs) = self.enumerate(dir);

        if !self.options.subdirectories || depth >= self.options.min_depth {
            for file in files {
                if self.limit_reached() || self.cancel.is_canceled() {
                    break;
                }
                self.files.push(file);
            }
            self.processed_directories += 1;
        }

        if !self.options.subdirectories {
            return;
        }

        self.ancestors.push(canonical);
        self.parse_subdirectories(subdirs, depth);
        self.ancestors.pop();
    }

    fn parse_subdirectories(&mut self, subdirs: Vec<PathBuf>, depth: usize) {
        for subdir in subdirs {
            if self.limit_reached() || self.cancel.is_canceled() {
                break;
            }
            if self.is_excluded(&subdir) {
                debug!("Excluded directory {}", subdir.display());
                continue;
            }
            self.parse_directory(&subdir, depth + 1);
            if self.limit_reached() {
                info!("File limit reached after parsing subdirectories. Stopping further parsing.");
                return;
            }
        }
    }

    /// Lists the direct children of `dir`, split into files and directories, sorted by name.
    fn enumerate(&self, dir: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let mut files = Vec::new();
        let mut dirs = Vec::new();

        let entries = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for entry in entries {
            if self.cancel.is_canceled() {
                break;
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            let path = entry.path();
            let is_link = entry.path_is_symlink();
            // Follows links so a symlink is classified by its target.
            let metadata = match fs::metadata(path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            if metadata.is_dir() {
                if is_link && self.options.ignore_symlink_dirs {
                    continue;
                }
                if self.options.ignore_hidden_dirs && is_hidden(path, &metadata) {
                    continue;
                }
                dirs.push(path.to_path_buf());
            } else if metadata.is_file() {
                if is_link && self.options.ignore_symlink_files {
                    continue;
                }
                if self.options.ignore_hidden_files && is_hidden(path, &metadata) {
                    continue;
                }
                files.push(path.to_path_buf());
            }
        }

        (files, dirs)
    }
}
