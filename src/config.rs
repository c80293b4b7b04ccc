use crate::error::{Result, RfseekError};
use crate::filters::{PatternSyntax, SizeSystem};
use crate::output_formats::OutputFormat;
use crate::request::{SearchLimits, SearchRequest, TraversalOptions};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub limits: SearchLimits,
    pub display: DisplayConfig,
}

/// Defaults applied to every search before command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub syntax: PatternSyntax,
    pub case_sensitive: bool,
    pub whole_words: bool,
    pub recursive: bool,
    pub ignore_hidden_dirs: bool,
    pub ignore_hidden_files: bool,
    pub ignore_symlink_dirs: bool,
    pub ignore_symlink_files: bool,
    pub skip_binary: bool,
    pub avoid_duplicates: bool,
    pub exclude_dirs: Vec<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            syntax: PatternSyntax::FixedString,
            case_sensitive: false,
            whole_words: false,
            recursive: false,
            ignore_hidden_dirs: false,
            ignore_hidden_files: false,
            ignore_symlink_dirs: false,
            ignore_symlink_files: false,
            skip_binary: false,
            avoid_duplicates: false,
            exclude_dirs: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub size_system: SizeSystem,
    pub output_format: OutputFormat,
    pub show_summary: bool,
    /// Per-row metadata and result statistics in text and JSON output.
    pub show_metadata: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            size_system: SizeSystem::Si,
            output_format: OutputFormat::Text,
            show_summary: true,
            show_metadata: true,
        }
    }
}

impl Config {
    /// Loads `explicit` when given, otherwise the first config file found.
    ///
    /// A missing explicit file is an error; no file at all yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_path(),
        };

        match config_path {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                let content = fs::read_to_string(&path).map_err(|e| {
                    RfseekError::Config(format!(
                        "Failed to read config file {}: {e}",
                        path.display()
                    ))
                })?;
                Self::parse(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn find_config_path() -> Option<PathBuf> {
        if let Some(xdg_config) = dirs::config_dir() {
            let xdg_path = xdg_config.join("rfseek/config.toml");
            if xdg_path.exists() {
                return Some(xdg_path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let home_path = home.join(".rfseek.toml");
            if home_path.exists() {
                return Some(home_path);
            }
        }

        let current_path = Path::new(".rfseek.toml");
        if current_path.exists() {
            return Some(current_path.to_path_buf());
        }

        None
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RfseekError::Config(format!("Failed to serialize config: {e}")))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// A request for `pattern` seeded with this configuration.
    pub fn base_request(&self, pattern: impl Into<String>) -> SearchRequest {
        let search = &self.search;
        let mut request = SearchRequest::new(pattern).with_exclude_dirs(&search.exclude_dirs);
        request.content.syntax = search.syntax;
        request.content.case_sensitive = search.case_sensitive;
        request.content.whole_words = search.whole_words;
        request.traversal = TraversalOptions {
            subdirectories: search.recursive,
            ignore_hidden_dirs: search.ignore_hidden_dirs,
            ignore_hidden_files: search.ignore_hidden_files,
            ignore_symlink_dirs: search.ignore_symlink_dirs,
            ignore_symlink_files: search.ignore_symlink_files,
            ..Default::default()
        };
        request.ignore_unparseable = search.skip_binary;
        request.avoid_duplicates = search.avoid_duplicates;
        request.limits = self.limits;
        request
    }
}
