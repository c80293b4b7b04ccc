use crate::controller::RunTiming;
use crate::error::Result;
use crate::export::export_csv;
use crate::filters::{SizeSystem, format_elapsed, format_size_human, format_timestamp};
use crate::results::{ResultRecord, ResultStatistics, TimeRange};
use crate::search::Statistics;
use clap::ValueEnum;
use colored::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::io::Write;

/// Output format types
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Renders result rows in one of the supported formats.
pub struct OutputFormatter {
    format: OutputFormat,
    include_metadata: bool,
    timing: Option<RunTiming>,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            include_metadata: true,
            timing: None,
        }
    }

    /// Toggles per-row metadata, result statistics and run statistics.
    pub fn with_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub fn with_timing(mut self, timing: RunTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    pub fn write_results<W: Write>(
        &self,
        rows: &[ResultRecord],
        statistics: Option<&Statistics>,
        out: &mut W,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Text => out.write_all(self.format_text(rows).as_bytes())?,
            OutputFormat::Json => {
                let value = self.format_json(rows, statistics);
                serde_json::to_writer_pretty(&mut *out, &value)?;
                writeln!(out)?;
            }
            OutputFormat::Csv => {
                export_csv(rows, &mut *out)?;
            }
        }
        Ok(())
    }

    fn format_json(&self, rows: &[ResultRecord], statistics: Option<&Statistics>) -> Value {
        let mut result = json!({
            "total_results": rows.len(),
            "results": rows,
        });
        if self.include_metadata {
            if let Some(stats) = statistics {
                result["statistics"] = json!(stats);
            }
            result["summary"] = json!(ResultStatistics::from_rows(rows));
            if let Some(timing) = &self.timing {
                result["timing"] = json!({
                    "started": timing.started,
                    "finished": timing.finished,
                    "elapsed": format_elapsed(timing.elapsed()),
                });
            }
        }
        result
    }

    /// Format as plain text (default)
    fn format_text(&self, rows: &[ResultRecord]) -> String {
        if rows.is_empty() {
            return format!("{}\n", "No matches found".yellow());
        }

        let mut output = format!("\n{} {} {}\n", "Found".green(), rows.len(), "files:".green());
        for row in rows {
            let polarity = if row.match_text { "" } else { " (no match)" };
            output.push_str(&format!(
                "{}{}\n",
                row.path.display().to_string().bold(),
                polarity.dimmed()
            ));

            if self.include_metadata {
                let modified = row
                    .modified
                    .as_ref()
                    .map(format_timestamp)
                    .unwrap_or_else(|| "-".to_string());
                output.push_str(&format!(
                    "  {} | {} | modified {}\n",
                    format_size_human(row.size, row.size_system),
                    row.mime_type,
                    modified
                ));
            }

            if !row.content.lines.is_empty() {
                output.push_str(&format!(
                    "  {} occurrence(s) on lines {}\n",
                    row.content.occurrences.to_string().cyan(),
                    row.content.lines_joined()
                ));
            }
        }

        if self.include_metadata {
            let system = rows[0].size_system;
            output.push_str(&format_summary(&ResultStatistics::from_rows(rows), system));
        }
        output
    }
}

fn format_range(label: &str, range: Option<&TimeRange>) -> String {
    match range {
        Some(range) => format!(
            "  {}: {} to {}\n",
            label,
            format_timestamp(&range.oldest),
            format_timestamp(&range.newest)
        ),
        None => String::new(),
    }
}

fn format_summary(stats: &ResultStatistics, system: SizeSystem) -> String {
    let size = |value: Option<u64>| {
        value
            .map(|v| format_size_human(v, system))
            .unwrap_or_else(|| "-".to_string())
    };

    let mut output = format!("\n{}\n", "Summary".green());
    output.push_str(&format!(
        "  Occurrences: {} total, at most {} in one file\n",
        stats.total_occurrences, stats.largest_occurrences
    ));
    output.push_str(&format!(
        "  Size: {} total, smallest {}, biggest {}\n",
        format_size_human(stats.total_size, system),
        size(stats.smallest_size),
        size(stats.biggest_size)
    ));
    output.push_str(&format_range("Created", stats.created.as_ref()));
    output.push_str(&format_range("Modified", stats.modified.as_ref()));
    output.push_str(&format_range("Accessed", stats.accessed.as_ref()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::SizeSystem;
    use crate::results::PatternSnapshot;
    use crate::scanner::ContentMatch;
    use std::path::PathBuf;

    fn row() -> ResultRecord {
        ResultRecord {
            id: 1,
            checked: false,
            path: PathBuf::from("/data/notes.txt"),
            name: "notes.txt".to_string(),
            size: 2048,
            size_system: SizeSystem::Iec,
            mime_type: "text/plain".to_string(),
            created: None,
            modified: None,
            accessed: None,
            content: ContentMatch {
                occurrences: 3,
                lines: [1, 4].into_iter().collect(),
            },
            pattern: PatternSnapshot {
                source: "todo".to_string(),
                case_insensitive: true,
            },
            match_text: true,
        }
    }

    fn render(format: OutputFormat, rows: &[ResultRecord]) -> String {
        render_with(OutputFormatter::new(format), rows)
    }

    fn render_with(formatter: OutputFormatter, rows: &[ResultRecord]) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        formatter
            .write_results(
                rows,
                Some(&Statistics {
                    processed_directories: 2,
                    processed_files: 5,
                }),
                &mut out,
            )
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_output() {
        let text = render(OutputFormat::Text, &[row()]);
        assert!(text.contains("Found 1 files:"));
        assert!(text.contains("/data/notes.txt"));
        assert!(text.contains("2 KiB | text/plain | modified -"));
        assert!(text.contains("3 occurrence(s) on lines 1-4"));
        assert!(text.contains("Occurrences: 3 total, at most 3 in one file"));
        assert!(text.contains("Size: 2 KiB total, smallest 2 KiB, biggest 2 KiB"));

        assert!(render(OutputFormat::Text, &[]).contains("No matches found"));
    }

    #[test]
    fn test_text_output_without_metadata() {
        let formatter = OutputFormatter::new(OutputFormat::Text).with_metadata(false);
        let text = render_with(formatter, &[row()]);
        assert!(text.contains("/data/notes.txt"));
        assert!(text.contains("3 occurrence(s) on lines 1-4"));
        assert!(!text.contains("text/plain"));
        assert!(!text.contains("Summary"));
    }

    #[test]
    fn test_json_output() {
        let text = render(OutputFormat::Json, &[row()]);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["total_results"], 1);
        assert_eq!(value["results"][0]["name"], "notes.txt");
        assert_eq!(value["results"][0]["content"]["occurrences"], 3);
        assert_eq!(value["statistics"]["processed_files"], 5);
        assert_eq!(value["summary"]["total_occurrences"], 3);
        assert_eq!(value["summary"]["biggest_size"], 2048);
        assert!(value.get("timing").is_none());
    }

    #[test]
    fn test_json_timing_and_metadata_toggle() {
        use chrono::{Local, TimeZone};

        let started = Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let timing = RunTiming {
            started,
            finished: started + chrono::Duration::seconds(65),
        };
        let formatter = OutputFormatter::new(OutputFormat::Json).with_timing(timing);
        let text = render_with(formatter, &[row()]);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["timing"]["elapsed"], "00:01:05");

        let bare = render_with(
            OutputFormatter::new(OutputFormat::Json)
                .with_timing(timing)
                .with_metadata(false),
            &[row()],
        );
        let value: Value = serde_json::from_str(&bare).unwrap();
        assert_eq!(value["total_results"], 1);
        assert!(value.get("statistics").is_none());
        assert!(value.get("summary").is_none());
        assert!(value.get("timing").is_none());
    }

    #[test]
    fn test_csv_output_has_header() {
        let text = render(OutputFormat::Csv, &[row()]);
        assert!(text.starts_with("\"√\";\"File\""));
        assert_eq!(text.lines().count(), 2);
    }
}
