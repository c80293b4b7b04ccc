//! File name include/exclude matching with fixed-string, wildcard and regex syntaxes.

use crate::error::Result;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSyntax {
    #[default]
    FixedString,
    Wildcard,
    RegularExpression,
}

impl PatternSyntax {
    /// Turns user text into regex source for this syntax.
    pub fn translate(self, text: &str) -> String {
        match self {
            PatternSyntax::FixedString => regex::escape(text),
            PatternSyntax::Wildcard => wildcard_to_regex(text),
            PatternSyntax::RegularExpression => text.to_string(),
        }
    }
}

impl fmt::Display for PatternSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternSyntax::FixedString => write!(f, "fixed"),
            PatternSyntax::Wildcard => write!(f, "wildcard"),
            PatternSyntax::RegularExpression => write!(f, "regex"),
        }
    }
}

impl FromStr for PatternSyntax {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" | "fixed_string" | "text" => Ok(PatternSyntax::FixedString),
            "wildcard" | "glob" => Ok(PatternSyntax::Wildcard),
            "regex" | "regular_expression" => Ok(PatternSyntax::RegularExpression),
            other => Err(format!("unknown pattern syntax '{other}'")),
        }
    }
}

/// Translates a shell-style glob into an anchored regex.
///
/// `*` and `?` never cross a `/`; `[...]` classes are kept, `[!...]` negates.
pub fn wildcard_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from(r"\A(?:");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => match glob_class(&chars, i) {
                Some((class, next)) => {
                    out.push_str(&class);
                    i = next;
                    continue;
                }
                None => out.push_str(r"\["),
            },
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            }
        }
        i += 1;
    }

    out.push_str(r")\z");
    out
}

/// Parses a bracket expression starting at `start`. Unterminated brackets yield `None`.
fn glob_class(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut class = String::from("[");
    let mut j = start + 1;

    if matches!(chars.get(j), Some('!') | Some('^')) {
        class.push('^');
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        class.push_str(r"\]");
        j += 1;
    }

    while j < chars.len() {
        match chars[j] {
            ']' => {
                class.push(']');
                return Some((class, j + 1));
            }
            c @ ('\\' | '[' | '&' | '~' | '^') => {
                class.push('\\');
                class.push(c);
            }
            c => class.push(c),
        }
        j += 1;
    }

    None
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilenamePattern {
    /// One or more sub-patterns separated by `;`.
    pub text: String,
    pub syntax: PatternSyntax,
    pub case_sensitive: bool,
    pub exact_match: bool,
    pub dont_match: bool,
}

/// Compiled form of a [`FilenamePattern`].
#[derive(Debug, Clone)]
pub struct FilenameMatcher {
    text: String,
    exact_fixed: bool,
    case_sensitive: bool,
    target: bool,
    patterns: Vec<Regex>,
}

impl FilenameMatcher {
    pub fn new(pattern: &FilenamePattern) -> Result<Self> {
        let exact_fixed = pattern.exact_match && pattern.syntax == PatternSyntax::FixedString;

        let patterns = if pattern.text.is_empty() || exact_fixed {
            Vec::new()
        } else {
            pattern
                .text
                .split(';')
                .map(|piece| {
                    RegexBuilder::new(&pattern.syntax.translate(piece))
                        .case_insensitive(!pattern.case_sensitive)
                        .build()
                })
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        Ok(Self {
            text: pattern.text.clone(),
            exact_fixed,
            case_sensitive: pattern.case_sensitive,
            target: !pattern.dont_match,
            patterns,
        })
    }

    /// A matcher that accepts every name.
    pub fn accept_all() -> Self {
        Self {
            text: String::new(),
            exact_fixed: false,
            case_sensitive: false,
            target: true,
            patterns: Vec::new(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.text.is_empty() {
            return true;
        }

        if self.exact_fixed {
            let equal = if self.case_sensitive {
                name == self.text
            } else {
                name.to_lowercase() == self.text.to_lowercase()
            };
            return equal == self.target;
        }

        if self.patterns.iter().any(|re| re.is_match(name)) {
            self.target
        } else {
            !self.target
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(text: &str, syntax: PatternSyntax) -> FilenamePattern {
        FilenamePattern {
            text: text.to_string(),
            syntax,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let mut pattern = matcher("", PatternSyntax::RegularExpression);
        pattern.dont_match = true;
        let m = FilenameMatcher::new(&pattern).unwrap();
        assert!(m.matches("anything.bin"));
        assert!(FilenameMatcher::accept_all().matches(""));
    }

    #[test]
    fn test_wildcard_translation() {
        assert_eq!(wildcard_to_regex("*.txt"), r"\A(?:[^/]*\.txt)\z");
        assert_eq!(wildcard_to_regex("a?c"), r"\A(?:a[^/]c)\z");
        assert_eq!(wildcard_to_regex("[!ab]x"), r"\A(?:[^ab]x)\z");
        assert_eq!(wildcard_to_regex("[x"), r"\A(?:\[x)\z");
    }

    #[test]
    fn test_wildcard_is_anchored() {
        let m = FilenameMatcher::new(&matcher("*.rs", PatternSyntax::Wildcard)).unwrap();
        assert!(m.matches("main.rs"));
        assert!(!m.matches("main.rs.bak"));
        let m = FilenameMatcher::new(&matcher("file[0-9].log", PatternSyntax::Wildcard)).unwrap();
        assert!(m.matches("file7.log"));
        assert!(!m.matches("fileA.log"));
    }

    #[test]
    fn test_semicolon_separated_sub_patterns() {
        let m = FilenameMatcher::new(&matcher("*.txt;*.md", PatternSyntax::Wildcard)).unwrap();
        assert!(m.matches("readme.md"));
        assert!(m.matches("notes.txt"));
        assert!(!m.matches("image.png"));
    }

    #[test]
    fn test_case_sensitivity() {
        let mut pattern = matcher("*.TXT", PatternSyntax::Wildcard);
        assert!(FilenameMatcher::new(&pattern).unwrap().matches("a.txt"));
        pattern.case_sensitive = true;
        assert!(!FilenameMatcher::new(&pattern).unwrap().matches("a.txt"));
    }

    #[test]
    fn test_fixed_string_is_substring_match() {
        let m = FilenameMatcher::new(&matcher("a.b", PatternSyntax::FixedString)).unwrap();
        assert!(m.matches("xa.by"));
        assert!(!m.matches("axb"));
    }

    #[test]
    fn test_dont_match_inverts_result() {
        let mut pattern = matcher("*.log", PatternSyntax::Wildcard);
        pattern.dont_match = true;
        let m = FilenameMatcher::new(&pattern).unwrap();
        assert!(!m.matches("server.log"));
        assert!(m.matches("server.txt"));
    }

    #[test]
    fn test_exact_fixed_string() {
        let mut pattern = matcher("Report.txt", PatternSyntax::FixedString);
        pattern.exact_match = true;
        let m = FilenameMatcher::new(&pattern).unwrap();
        assert!(m.matches("report.TXT"));
        assert!(!m.matches("Report.txt.bak"));

        pattern.case_sensitive = true;
        pattern.dont_match = true;
        let m = FilenameMatcher::new(&pattern).unwrap();
        assert!(!m.matches("Report.txt"));
        assert!(m.matches("report.txt"));
    }

    #[test]
    fn test_exact_match_ignored_for_other_syntaxes() {
        let mut pattern = matcher("rep", PatternSyntax::RegularExpression);
        pattern.exact_match = true;
        assert!(FilenameMatcher::new(&pattern).unwrap().matches("report.txt"));
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        assert!(FilenameMatcher::new(&matcher("(", PatternSyntax::RegularExpression)).is_err());
    }
}
