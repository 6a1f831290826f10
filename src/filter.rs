//! Table-inclusion filtering.
//!
//! A table converts when any configured pattern matches from the start of
//! its name. No configured patterns means every table converts; an empty
//! pattern list matches nothing.

use regex::Regex;
use snafu::ResultExt;

use crate::error::{ConfigError, InvalidTablePatternSnafu};

/// Compile `pattern` anchored to the start of the subject.
pub(crate) fn anchored_regex(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})")).context(InvalidTablePatternSnafu { pattern })
}

/// Decides which tables are converted.
#[derive(Debug)]
pub struct TableFilter {
    patterns: Option<Vec<Regex>>,
}

impl TableFilter {
    pub fn new(patterns: Option<&[String]>) -> Result<Self, ConfigError> {
        let patterns = match patterns {
            None => None,
            Some(list) => Some(
                list.iter()
                    .map(|p| anchored_regex(p))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
        };
        Ok(Self { patterns })
    }

    /// Should records for `table` be converted?
    pub fn matches(&self, table: &str) -> bool {
        match &self.patterns {
            None => true,
            Some(patterns) => patterns.iter().any(|re| re.is_match(table)),
        }
    }
}
