//! CSV persistence of result sets: `;` delimited, every field quoted.

use crate::controller::CancelToken;
use crate::error::{Result, RfseekError};
use crate::filters::SizeSystem;
use crate::results::{PatternSnapshot, ResultRecord, ResultSink, ResultsModel};
use crate::scanner::ContentMatch;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use csv::{QuoteStyle, ReaderBuilder, Trim, WriterBuilder};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const CSV_HEADER: [&str; 14] = [
    "√",
    "File",
    "Path",
    "Size",
    "Size System",
    "MIME Type",
    "Created",
    "Modified",
    "Accessed",
    "Founds",
    "lines",
    "Match Text",
    "Search Text Pattern",
    "Case Insensitive",
];

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub canceled: bool,
}

fn iso(timestamp: &Option<DateTime<Local>>) -> String {
    timestamp
        .map(|ts| ts.format(ISO_FORMAT).to_string())
        .unwrap_or_default()
}

fn parse_iso(field: &str) -> Option<DateTime<Local>> {
    if field.is_empty() {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(field, ISO_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(field, "%Y-%m-%d %H:%M:%S"))
        .ok()?;
    Local.from_local_datetime(&naive).earliest()
}

fn parse_flag(field: &str) -> bool {
    field == "1" || field.eq_ignore_ascii_case("true")
}

/// Writes `rows` with the header and returns the number of data rows written.
pub fn export_csv<W: Write>(rows: &[ResultRecord], writer: W) -> Result<usize> {
    let mut csv = WriterBuilder::new()
        .delimiter(b';')
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    csv.write_record(CSV_HEADER)?;
    for row in rows {
        csv.write_record([
            if row.checked { "x" } else { "" }.to_string(),
            row.name.clone(),
            row.path.to_string_lossy().into_owned(),
            row.size.to_string(),
            row.size_system.to_string(),
            row.mime_type.clone(),
            iso(&row.created),
            iso(&row.modified),
            iso(&row.accessed),
            row.content.occurrences.to_string(),
            row.content.lines_joined(),
            row.match_text.to_string(),
            row.pattern.source.clone(),
            row.pattern.option_flags().to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(rows.len())
}

/// Exports to `path`, appending a `.csv` extension when missing. Returns the path written.
pub fn export_file(rows: &[ResultRecord], path: &Path) -> Result<PathBuf> {
    let has_csv_ext = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let target = if has_csv_ext {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".csv");
        PathBuf::from(name)
    };

    let written = export_csv(rows, File::create(&target)?)?;
    info!("Exported {} results to {}", written, target.display());
    Ok(target)
}

/// Reads rows into `model`. `source` only labels errors.
///
/// Rows with a wrong column count or an already seen path are skipped.
pub fn import_csv<R: Read>(
    reader: R,
    source: &Path,
    model: &mut ResultsModel,
    cancel: &CancelToken,
) -> Result<ImportSummary> {
    let mut csv = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = csv.records();
    let header = match records.next() {
        Some(header) => header?,
        None => {
            return Err(RfseekError::InvalidResultsFile {
                path: source.to_path_buf(),
                reason: "file is empty".to_string(),
            });
        }
    };
    if !header.iter().eq(CSV_HEADER.iter().copied()) {
        return Err(RfseekError::InvalidResultsFile {
            path: source.to_path_buf(),
            reason: "unexpected header".to_string(),
        });
    }

    let mut summary = ImportSummary::default();
    let mut seen_paths: HashSet<String> = model
        .rows()
        .iter()
        .map(|r| r.path.to_string_lossy().into_owned())
        .collect();

    model.begin_reset();
    for record in records {
        if cancel.is_canceled() {
            summary.canceled = true;
            break;
        }
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed row in {}: {}", source.display(), e);
                summary.skipped += 1;
                continue;
            }
        };
        if record.len() != CSV_HEADER.len() {
            debug!("Skipping row with {} columns", record.len());
            summary.skipped += 1;
            continue;
        }
        let path = &record[2];
        if !seen_paths.insert(path.to_string()) {
            debug!("Skipping duplicate path {}", path);
            summary.skipped += 1;
            continue;
        }

        let lines = record[10]
            .split('-')
            .filter_map(|n| n.trim().parse::<usize>().ok())
            .collect();

        model.push_record(ResultRecord {
            id: 0,
            checked: &record[0] == "x",
            path: PathBuf::from(path),
            name: record[1].to_string(),
            size: record[3].parse().unwrap_or(0),
            size_system: record[4].parse().unwrap_or(SizeSystem::Si),
            mime_type: record[5].to_string(),
            created: parse_iso(&record[6]),
            modified: parse_iso(&record[7]),
            accessed: parse_iso(&record[8]),
            content: ContentMatch {
                occurrences: record[9].parse().unwrap_or(0),
                lines,
            },
            pattern: PatternSnapshot {
                source: record[12].to_string(),
                case_insensitive: parse_flag(&record[13]),
            },
            match_text: parse_flag(&record[11]),
        });
        summary.imported += 1;
    }
    model.end_reset();

    info!(
        "Imported {} results from {} ({} skipped)",
        summary.imported,
        source.display(),
        summary.skipped
    );
    Ok(summary)
}

pub fn import_file(path: &Path, model: &mut ResultsModel, cancel: &CancelToken) -> Result<ImportSummary> {
    import_csv(File::open(path)?, path, model, cancel)
}
