//! Column value reinterpretation.
//!
//! String values in a dump sometimes carry a second encoding: a JSON
//! document or a PHP-serialized array stored in a text column. Decoders
//! sniff the raw string and, when they recognize it, replace it with the
//! structured value. Anything unrecognized, or any decode failure, falls
//! through to the raw string unchanged.

mod json;
mod php;

pub use json::JsonDecoder;
pub use php::PhpDecoder;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ConfigError;
use crate::filter::anchored_regex;

/// A format-sniffing decoder for raw string values.
pub trait ValueDecoder: Send + Sync {
    /// Human-readable name of this decoder (for logging).
    fn name(&self) -> &'static str;

    /// Cheap sniff: does the raw string look like this encoding?
    fn matches(&self, raw: &str) -> bool;

    /// Attempt the decode. `None` falls through to the raw value.
    fn decode(&self, raw: &str) -> Option<Value>;
}

/// The decoders that can be configured per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    Json,
    Phps,
}

impl DecoderKind {
    fn decoder(self) -> &'static dyn ValueDecoder {
        match self {
            DecoderKind::Json => &JsonDecoder,
            DecoderKind::Phps => &PhpDecoder,
        }
    }
}

/// Per-column decoder lists for one table.
pub type ColumnDecoders = IndexMap<String, Vec<DecoderKind>>;

/// Compiled decoder configuration: table pattern -> column -> decoders.
pub struct DecoderSet {
    tables: Vec<(Regex, ColumnDecoders)>,
}

impl DecoderSet {
    pub fn new(config: Option<&IndexMap<String, ColumnDecoders>>) -> Result<Self, ConfigError> {
        let mut tables = Vec::new();
        if let Some(map) = config {
            for (pattern, columns) in map {
                tables.push((anchored_regex(pattern)?, columns.clone()));
            }
        }
        Ok(Self { tables })
    }

    /// Column decoders applying to `table`; the first matching pattern wins.
    pub fn for_table(&self, table: &str) -> Option<&ColumnDecoders> {
        self.tables
            .iter()
            .find(|(re, _)| re.is_match(table))
            .map(|(_, columns)| columns)
    }
}

/// Run `raw` through `kinds` in order; the first successful decode wins.
pub fn reinterpret(kinds: &[DecoderKind], raw: &str) -> Option<Value> {
    for kind in kinds {
        let decoder = kind.decoder();
        if !decoder.matches(raw) {
            continue;
        }
        if let Some(value) = decoder.decode(raw) {
            return Some(value);
        }
        debug!(decoder = decoder.name(), "decode failed, keeping raw value");
    }
    None
}
