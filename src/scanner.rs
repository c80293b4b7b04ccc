//! Line oriented occurrence scanner with timeout, occurrence limit and cancellation.

use crate::controller::CancelToken;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::Path;
use std::time::{Duration, Instant};

/// Lines processed between two timeout/cancellation checks.
pub const CHECK_INTERVAL: usize = 100;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Occurrences found in one file and the 1-based lines holding them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMatch {
    pub occurrences: usize,
    pub lines: BTreeSet<usize>,
}

impl ContentMatch {
    pub fn is_empty(&self) -> bool {
        self.occurrences == 0
    }

    /// Sorted line numbers joined with `-`, e.g. `1-4-9`.
    pub fn lines_joined(&self) -> String {
        self.lines
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanLimits {
    pub timeout: Option<Duration>,
    pub max_occurrences: Option<usize>,
}

impl ScanLimits {
    /// Builds limits from UI style `(enabled, value)` pairs; timeout is in seconds.
    pub fn from_flags(
        timeout_enabled: bool,
        timeout_secs: u64,
        limit_enabled: bool,
        max_occurrences: usize,
    ) -> Self {
        Self {
            timeout: timeout_enabled.then(|| Duration::from_secs(timeout_secs)),
            max_occurrences: limit_enabled.then_some(max_occurrences),
        }
    }

    fn limit_reached(&self, occurrences: usize) -> bool {
        self.max_occurrences.is_some_and(|max| occurrences >= max)
    }
}

/// Scans `reader` line by line and counts every match of `pattern`.
///
/// Every [`CHECK_INTERVAL`] lines the cancel token is polled, then the timeout.
/// A cancellation returns what was gathered so far; read errors end the scan early.
pub fn scan<R: BufRead>(
    mut reader: R,
    limits: &ScanLimits,
    pattern: &Regex,
    cancel: &CancelToken,
    label: &Path,
) -> ContentMatch {
    let started = Instant::now();
    let mut result = ContentMatch::default();
    let mut buf = Vec::new();
    let mut line_number = 0usize;
    let mut since_check = 0usize;

    loop {
        if since_check >= CHECK_INTERVAL {
            if cancel.is_canceled() {
                debug!("Scan of {} canceled at line {}", label.display(), line_number);
                return result;
            }
            if let Some(timeout) = limits.timeout {
                if started.elapsed() > timeout {
                    warn!("File reading timeout reached for {}", label.display());
                    break;
                }
            }
            since_check = 0;
        }

        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read {}: {}", label.display(), e);
                break;
            }
        }
        line_number += 1;

        let mut bytes = buf.as_slice();
        if line_number == 1 {
            bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        }
        if let Some(stripped) = bytes.strip_suffix(b"\n") {
            bytes = stripped;
        }
        if let Some(stripped) = bytes.strip_suffix(b"\r") {
            bytes = stripped;
        }
        let line = String::from_utf8_lossy(bytes);

        for _ in pattern.find_iter(&line) {
            result.occurrences += 1;
            result.lines.insert(line_number);
            if limits.limit_reached(result.occurrences) {
                warn!("Occurrences limit reached for {}", label.display());
                break;
            }
        }

        since_check += 1;
        if limits.limit_reached(result.occurrences) {
            break;
        }
    }

    result
}
