use crate::config::Config;
use crate::error::{Result, RfseekError};
use crate::filters::{
    DateCondition, DateFilter, FilenamePattern, FilterPredicate, PatternSyntax, SizeCondition,
    SizeFilter, SizeSystem,
};
use crate::hash::MurmurVariant;
use crate::output_formats::OutputFormat;
use crate::request::SearchRequest;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(long, value_parser, default_value_t = false, global = true)]
    pub verbose: bool,

    #[clap(long, value_parser, global = true)]
    pub log: Option<PathBuf>,

    /// Configuration file to use instead of the default locations
    #[clap(long, value_parser, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search directories for files containing (or lacking) a pattern
    Search(SearchArgs),

    /// Re-check the files of an exported CSV result set and rewrite it
    Rescan {
        csv: PathBuf,

        /// Where to write the refreshed results (defaults to the input file)
        #[clap(long, value_parser)]
        output: Option<PathBuf>,

        /// Keep files with no occurrences instead of files with some
        #[clap(long, value_parser, default_value_t = false)]
        invert: bool,

        #[clap(long, value_parser)]
        timeout: Option<u64>,

        #[clap(long, value_parser)]
        max_occurrences: Option<usize>,
    },

    /// Print the MurmurHash3 digest of a file
    Hash {
        file: PathBuf,

        #[clap(long, value_parser, default_value = "x64_128")]
        variant: MurmurVariant,

        /// Also print the SHA-256 digest
        #[clap(long, value_parser, default_value_t = false)]
        sha256: bool,
    },

    /// Generate shell completion scripts
    Completions {
        #[clap(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    pub pattern: String,

    #[clap(default_value = ".")]
    pub dirs: Vec<PathBuf>,

    /// Pattern syntax: fixed, wildcard or regex
    #[clap(long, value_parser)]
    pub syntax: Option<PatternSyntax>,

    #[clap(short = 's', long, value_parser, default_value_t = false)]
    pub case_sensitive: bool,

    #[clap(short = 'w', long, value_parser, default_value_t = false)]
    pub whole_words: bool,

    /// Report files that do NOT contain the pattern
    #[clap(short = 'v', long, value_parser, default_value_t = false)]
    pub invert: bool,

    #[clap(short, long, value_parser, default_value_t = false)]
    pub recursive: bool,

    #[clap(long, value_parser)]
    pub min_depth: Option<usize>,

    #[clap(long, value_parser)]
    pub max_depth: Option<usize>,

    #[clap(long, value_parser, default_value_t = false)]
    pub ignore_hidden_dirs: bool,

    #[clap(long, value_parser, default_value_t = false)]
    pub ignore_hidden_files: bool,

    #[clap(long, value_parser, default_value_t = false)]
    pub ignore_symlink_dirs: bool,

    #[clap(long, value_parser, default_value_t = false)]
    pub ignore_symlink_files: bool,

    /// Directory to leave out; may be repeated
    #[clap(long, value_parser)]
    pub exclude: Vec<PathBuf>,

    /// Only consider files whose name matches this pattern
    #[clap(long, value_parser)]
    pub name: Option<String>,

    #[clap(long, value_parser)]
    pub name_syntax: Option<PatternSyntax>,

    #[clap(long, value_parser, default_value_t = false)]
    pub name_case_sensitive: bool,

    /// The name pattern must match the whole file name
    #[clap(long, value_parser, default_value_t = false)]
    pub name_exact: bool,

    /// Skip files whose name matches instead
    #[clap(long, value_parser, default_value_t = false)]
    pub name_invert: bool,

    /// Size filter: OP,SIZE[,SIZE] with OP one of eq, ne, lt, gt, between, not-between (e.g. gt,10KB)
    #[clap(long, value_parser = parse_size_arg)]
    pub size: Option<SizeArg>,

    /// Creation date filter: OP,DATE[,DATE] with OP one of eq, ne, before, after, between, not-between
    #[clap(long, value_parser = parse_date_arg)]
    pub created: Option<DateArg>,

    #[clap(long, value_parser = parse_date_arg)]
    pub modified: Option<DateArg>,

    #[clap(long, value_parser = parse_date_arg)]
    pub accessed: Option<DateArg>,

    /// Allowed MIME types
    #[clap(long, value_parser, use_value_delimiter = true)]
    pub mime: Vec<String>,

    #[clap(long, value_parser, default_value_t = false)]
    pub skip_binary: bool,

    /// Skip files whose content was already seen
    #[clap(long, value_parser, default_value_t = false)]
    pub dedup: bool,

    /// Per-file scan timeout in seconds
    #[clap(long, value_parser)]
    pub timeout: Option<u64>,

    #[clap(long, value_parser)]
    pub max_files: Option<usize>,

    #[clap(long, value_parser)]
    pub max_occurrences: Option<usize>,

    #[clap(short, long, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// SI or IEC
    #[clap(long, value_parser)]
    pub size_system: Option<SizeSystem>,

    /// Also save the results as CSV
    #[clap(long, value_parser)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizeArg {
    pub condition: SizeCondition,
    pub value1: f64,
    pub unit1: String,
    pub value2: f64,
    pub unit2: String,
    /// Set when the units belong to one system only.
    pub system: Option<SizeSystem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateArg {
    pub condition: DateCondition,
    pub value1: DateTime<Local>,
    pub value2: DateTime<Local>,
}

fn split_filter_arg(arg: &str) -> std::result::Result<(&str, Vec<&str>), String> {
    let mut parts = arg.split(',').map(str::trim);
    let op = parts.next().filter(|op| !op.is_empty()).ok_or("missing operator")?;
    let values: Vec<&str> = parts.collect();
    if values.is_empty() || values.len() > 2 {
        return Err(format!("expected one or two values in '{arg}'"));
    }
    Ok((op, values))
}

fn check_arity(between: bool, values: &[&str]) -> std::result::Result<(), String> {
    match (between, values.len()) {
        (true, 2) | (false, 1) => Ok(()),
        (true, _) => Err("range operators need two values".to_string()),
        (false, _) => Err("this operator takes a single value".to_string()),
    }
}

fn parse_size_value(text: &str) -> std::result::Result<(f64, String, Option<SizeSystem>), String> {
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid size '{text}'"))?;
    let unit = match unit.trim() {
        "" | "B" => "Bytes".to_string(),
        other => other.to_string(),
    };
    // Byte units exist in both systems and do not pin one.
    let system = match (
        SizeSystem::Si.unit_factor(&unit),
        SizeSystem::Iec.unit_factor(&unit),
    ) {
        (Some(_), Some(_)) => None,
        (Some(_), None) => Some(SizeSystem::Si),
        (None, Some(_)) => Some(SizeSystem::Iec),
        (None, None) => return Err(format!("unknown size unit '{unit}'")),
    };
    Ok((value, unit, system))
}

fn parse_size_arg(arg: &str) -> std::result::Result<SizeArg, String> {
    let (op, values) = split_filter_arg(arg)?;
    let condition = match op {
        "eq" => SizeCondition::Equals,
        "ne" => SizeCondition::NotEquals,
        "lt" => SizeCondition::LessThan,
        "gt" => SizeCondition::GreaterThan,
        "between" => SizeCondition::Between,
        "not-between" => SizeCondition::NotBetween,
        other => return Err(format!("unknown size operator '{other}'")),
    };
    check_arity(
        matches!(condition, SizeCondition::Between | SizeCondition::NotBetween),
        &values,
    )?;

    let (value1, unit1, system1) = parse_size_value(values[0])?;
    let (value2, unit2, system2) = match values.get(1) {
        Some(v) => parse_size_value(v)?,
        None => (0.0, "Bytes".to_string(), None),
    };
    let system = match (system1, system2) {
        (Some(a), Some(b)) if a != b => {
            return Err(format!("'{arg}' mixes SI and IEC units"));
        }
        (a, b) => a.or(b),
    };
    Ok(SizeArg {
        condition,
        value1,
        unit1,
        value2,
        unit2,
        system,
    })
}

fn parse_date(text: &str) -> std::result::Result<DateTime<Local>, String> {
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("invalid date '{text}', expected YYYY-MM-DD[ HH:MM:SS]"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("'{text}' does not exist in the local time zone"))
}

fn parse_date_arg(arg: &str) -> std::result::Result<DateArg, String> {
    let (op, values) = split_filter_arg(arg)?;
    let condition = match op {
        "eq" => DateCondition::Equals,
        "ne" => DateCondition::NotEquals,
        "before" => DateCondition::Before,
        "after" => DateCondition::After,
        "between" => DateCondition::Between,
        "not-between" => DateCondition::NotBetween,
        other => return Err(format!("unknown date operator '{other}'")),
    };
    check_arity(
        matches!(condition, DateCondition::Between | DateCondition::NotBetween),
        &values,
    )?;

    let value1 = parse_date(values[0])?;
    let value2 = match values.get(1) {
        Some(v) => parse_date(v)?,
        None => value1,
    };
    Ok(DateArg {
        condition,
        value1,
        value2,
    })
}

impl DateArg {
    fn to_filter(&self) -> DateFilter {
        DateFilter {
            condition: self.condition,
            value1: self.value1,
            value2: self.value2,
        }
    }
}

impl SearchArgs {
    /// Builds the request: `config` supplies defaults, flags switch options on.
    pub fn to_request(&self, config: &Config) -> Result<SearchRequest> {
        let mut request = config
            .base_request(self.pattern.clone())
            .with_include_dirs(&self.dirs)
            .with_exclude_dirs(&self.exclude)
            .with_mime_types(&self.mime);

        let content = &mut request.content;
        if let Some(syntax) = self.syntax {
            content.syntax = syntax;
        }
        content.case_sensitive |= self.case_sensitive;
        content.whole_words |= self.whole_words;
        content.dont_match = self.invert;

        let traversal = &mut request.traversal;
        traversal.subdirectories |= self.recursive;
        if let Some(min) = self.min_depth {
            traversal.min_depth = min;
        }
        if self.max_depth.is_some() {
            traversal.max_depth = self.max_depth;
        }
        traversal.ignore_hidden_dirs |= self.ignore_hidden_dirs;
        traversal.ignore_hidden_files |= self.ignore_hidden_files;
        traversal.ignore_symlink_dirs |= self.ignore_symlink_dirs;
        traversal.ignore_symlink_files |= self.ignore_symlink_files;

        if let Some(name) = &self.name {
            request.filename = FilenamePattern {
                text: name.clone(),
                syntax: self.name_syntax.unwrap_or(PatternSyntax::Wildcard),
                case_sensitive: self.name_case_sensitive,
                exact_match: self.name_exact,
                dont_match: self.name_invert,
            };
        }

        let size_system = self.size_system.unwrap_or(config.display.size_system);
        if let Some(size) = &self.size {
            request.filters.push(FilterPredicate::Size(SizeFilter {
                system: size.system.unwrap_or(size_system),
                condition: size.condition,
                value1: size.value1,
                value2: size.value2,
                unit1: size.unit1.clone(),
                unit2: size.unit2.clone(),
            }));
        }
        if let Some(date) = &self.created {
            request
                .filters
                .push(FilterPredicate::CreationDate(date.to_filter()));
        }
        if let Some(date) = &self.modified {
            request
                .filters
                .push(FilterPredicate::ModificationDate(date.to_filter()));
        }
        if let Some(date) = &self.accessed {
            request
                .filters
                .push(FilterPredicate::AccessDate(date.to_filter()));
        }

        request.ignore_unparseable |= self.skip_binary;
        request.avoid_duplicates |= self.dedup;
        if self.timeout.is_some() {
            request.limits.timeout_secs = self.timeout;
        }
        if self.max_files.is_some() {
            request.limits.max_files = self.max_files;
        }
        if self.max_occurrences.is_some() {
            request.limits.max_occurrences = self.max_occurrences;
        }

        request.validate()?;
        if self.name.is_none() && self.name_syntax.is_some() {
            return Err(RfseekError::InvalidRequest(
                "--name-syntax requires --name".to_string(),
            ));
        }
        Ok(request)
    }
}
