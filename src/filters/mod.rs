//! Candidate filters: file names, sizes, dates and MIME types.

pub mod date;
pub mod filename;
pub mod predicate;
pub mod size;

pub use date::{DateCondition, format_elapsed, format_timestamp, matches_date};
pub use filename::{FilenameMatcher, FilenamePattern, PatternSyntax, wildcard_to_regex};
pub use predicate::{
    DateFilter, FileCandidate, FilterPredicate, SizeFilter, first_rejection, matches_all,
};
pub use size::{SizeCondition, SizeSystem, convert_size, format_size_human, matches_size};
