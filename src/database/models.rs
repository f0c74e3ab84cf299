//! Database Models
//!
//! Record types for word keys, sentences, frequency rows and the cursors
//! used to page through them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Word Key
// ============================================================================

/// A root word plus its ordered part-of-speech fields.
///
/// The tuple is the identity of a row in the frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WordKey {
    pub word: String,
    pub pos: Vec<String>,
}

impl WordKey {
    pub fn new(word: impl Into<String>, pos: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            word: word.into(),
            pos: pos.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of facet dimensions (word + POS fields).
    pub fn dimensions(&self) -> usize {
        self.pos.len() + 1
    }

    /// Field values in dimension order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.word.as_str()).chain(self.pos.iter().map(String::as_str))
    }
}

impl fmt::Display for WordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.word, self.pos.join(","))
    }
}

// ============================================================================
// Sentence Record
// ============================================================================

/// Sentence table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SentenceRecord {
    pub id: i64,
    pub sentence: String,
    pub length: i64, // characters, not bytes
}

/// Position after which the next concordance page starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceCursor {
    pub length: i64,
    pub id: i64,
}

impl From<&SentenceRecord> for SentenceCursor {
    fn from(record: &SentenceRecord) -> Self {
        Self {
            length: record.length,
            id: record.id,
        }
    }
}

/// One page of a concordance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentencePage {
    pub sentences: Vec<SentenceRecord>,
    pub next: Option<SentenceCursor>,
}

// ============================================================================
// Frequency Rows
// ============================================================================

/// A displayed field of a frequency row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Value(String),
    /// The dimension was aggregated away; its values are summed together.
    Aggregated,
}

impl FieldValue {
    pub fn as_value(&self) -> Option<&str> {
        match self {
            FieldValue::Value(v) => Some(v),
            FieldValue::Aggregated => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Value(v) => f.write_str(v),
            FieldValue::Aggregated => f.write_str("#"),
        }
    }
}

/// Summed frequency of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyRow {
    pub frequency: i64,
    /// One entry per dimension, in dimension order.
    pub fields: Vec<FieldValue>,
}

impl FrequencyRow {
    /// Share of `total` in percent.
    pub fn share(&self, total: i64) -> f64 {
        if total <= 0 {
            return 0.0;
        }
        100.0 * self.frequency as f64 / total as f64
    }

    /// Values of the grouped (non-aggregated) fields.
    pub fn grouped_values(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter_map(|f| f.as_value().map(str::to_string))
            .collect()
    }
}

/// Position after which the next frequency page starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyCursor {
    pub frequency: i64,
    pub values: Vec<String>,
}

impl From<&FrequencyRow> for FrequencyCursor {
    fn from(row: &FrequencyRow) -> Self {
        Self {
            frequency: row.frequency,
            values: row.grouped_values(),
        }
    }
}

/// Result of a frequency query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyPage {
    /// Sum of counters over every row matching the filter.
    pub total: i64,
    /// Number of matching rows before grouping.
    pub distinct: i64,
    pub rows: Vec<FrequencyRow>,
    pub next: Option<FrequencyCursor>,
}

// ============================================================================
// Cursor Text Form
// ============================================================================

// Cursors print as compact JSON so a page can be resumed from the command line.

impl fmt::Display for FrequencyCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serde_json::to_string(self).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for FrequencyCursor {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

impl fmt::Display for SentenceCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serde_json::to_string(self).map_err(|_| fmt::Error)?)
    }
}

impl FromStr for SentenceCursor {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

// ============================================================================
// Corpus Registry
// ============================================================================

/// Registered corpus
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CorpusRecord {
    pub name: String,
    pub pos_fields: i64,
    pub created_at: String,
}
