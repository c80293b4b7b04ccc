//! Recursive file-content occurrence search.
//!
//! A [`SearchRequest`] names the directories to walk, the file filters and the
//! content pattern. [`OccurrenceSearch`] runs it synchronously into a
//! [`ResultSink`]; [`SearchController`] runs it on a worker thread with
//! cooperative cancellation.

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod file_types;
pub mod filters;
pub mod hash;
pub mod output_formats;
pub mod progress;
pub mod request;
pub mod results;
pub mod scanner;
pub mod search;
pub mod walker;

pub use controller::{CancelToken, RunTiming, SearchController, SearchReport};
pub use error::{Result, RfseekError};
pub use request::{ContentPattern, SearchLimits, SearchRequest, TraversalOptions};
pub use results::{PatternSnapshot, ResultRecord, ResultSink, ResultStatistics, ResultsModel};
pub use scanner::{ContentMatch, ScanLimits};
pub use search::{OccurrenceSearch, SearchEvent, SearchOutcome, Statistics};
