//! Corpus Schema
//!
//! Table naming, column layout and DDL for a corpus. Each corpus owns three
//! tables named after a validated prefix; a shared `corpora` registry
//! remembers how many POS fields each corpus was created with.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::error::{Result, StoreError};
use super::models::{CorpusRecord, WordKey};
use super::selection::SelectionVector;

/// Default number of POS fields produced by the IPA dictionary.
pub const DEFAULT_POS_FIELDS: usize = 6;

const REGISTRY_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS corpora (
    name TEXT PRIMARY KEY COLLATE NOCASE,
    pos_fields INTEGER NOT NULL,
    created_at TEXT NOT NULL
)
"#;

static PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("valid prefix regex"));

/// SQLite reserves object names starting with this.
const RESERVED_PREFIX: &str = "sqlite_";

// ============================================================================
// Table Prefix
// ============================================================================

/// A corpus name that is safe to use as an SQL identifier prefix.
///
/// SQLite table names are case-insensitive, so the prefix is stored in
/// lower case: `Novels` and `novels` name the same corpus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TablePrefix(String);

impl TablePrefix {
    pub fn new(name: &str) -> Result<Self> {
        let normalized = name.to_ascii_lowercase();
        if PREFIX_PATTERN.is_match(name) && !normalized.starts_with(RESERVED_PREFIX) {
            Ok(Self(normalized))
        } else {
            Err(StoreError::InvalidTablePrefix(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Dimension
// ============================================================================

/// A validated facet dimension: 0 is the word, `i > 0` is `pos{i-1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dimension(usize);

impl Dimension {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn column(self) -> String {
        match self.0 {
            0 => "word".to_string(),
            i => format!("pos{}", i - 1),
        }
    }
}

// ============================================================================
// Corpus Schema
// ============================================================================

/// Table names and key layout of one corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusSchema {
    prefix: TablePrefix,
    pos_fields: usize,
}

impl CorpusSchema {
    pub fn new(name: &str, pos_fields: usize) -> Result<Self> {
        Ok(Self {
            prefix: TablePrefix::new(name)?,
            pos_fields,
        })
    }

    pub fn name(&self) -> &str {
        self.prefix.as_str()
    }

    pub fn pos_fields(&self) -> usize {
        self.pos_fields
    }

    /// Word plus POS fields.
    pub fn dimensions(&self) -> usize {
        self.pos_fields + 1
    }

    pub fn freqs_table(&self) -> String {
        format!("{}_freqs", self.prefix.as_str())
    }

    pub fn sentences_table(&self) -> String {
        format!("{}_sentences", self.prefix.as_str())
    }

    pub fn links_table(&self) -> String {
        format!("{}_links", self.prefix.as_str())
    }

    /// Validates a dimension index against this corpus.
    pub fn dimension(&self, index: usize) -> Result<Dimension> {
        if index < self.dimensions() {
            Ok(Dimension(index))
        } else {
            Err(StoreError::DimensionOutOfRange {
                index,
                dimensions: self.dimensions(),
            })
        }
    }

    pub fn all_dimensions(&self) -> impl Iterator<Item = Dimension> {
        (0..self.dimensions()).map(Dimension)
    }

    /// Key columns in dimension order, comma separated.
    pub fn key_columns(&self) -> String {
        self.all_dimensions()
            .map(Dimension::column)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn check_selection(&self, selection: &SelectionVector) -> Result<()> {
        if selection.len() == self.dimensions() {
            Ok(())
        } else {
            Err(StoreError::SelectionArity {
                expected: self.dimensions(),
                got: selection.len(),
            })
        }
    }

    pub fn check_key(&self, key: &WordKey) -> Result<()> {
        if key.pos.len() == self.pos_fields {
            Ok(())
        } else {
            Err(StoreError::KeyArity {
                expected: self.pos_fields,
                got: key.pos.len(),
            })
        }
    }

    /// CREATE statements for the corpus tables and their indexes.
    pub fn create_statements(&self) -> Vec<String> {
        let freqs = self.freqs_table();
        let sentences = self.sentences_table();
        let links = self.links_table();
        let pos_columns: String = (0..self.pos_fields)
            .map(|i| format!(",\n    pos{i} TEXT NOT NULL"))
            .collect();

        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {freqs} (\n    id INTEGER PRIMARY KEY,\n    freq INTEGER NOT NULL,\n    word TEXT NOT NULL{pos_columns},\n    UNIQUE ({})\n)",
                self.key_columns()
            ),
            format!("CREATE INDEX IF NOT EXISTS idx_{freqs}_freq ON {freqs}(freq)"),
            format!(
                "CREATE TABLE IF NOT EXISTS {sentences} (\n    id INTEGER PRIMARY KEY,\n    sentence TEXT NOT NULL,\n    length INTEGER NOT NULL\n)"
            ),
            format!("CREATE INDEX IF NOT EXISTS idx_{sentences}_length ON {sentences}(length)"),
            format!(
                "CREATE TABLE IF NOT EXISTS {links} (\n    word_id INTEGER NOT NULL REFERENCES {freqs}(id),\n    sentence_id INTEGER NOT NULL REFERENCES {sentences}(id)\n)"
            ),
            format!("CREATE INDEX IF NOT EXISTS idx_{links}_word ON {links}(word_id)"),
        ]
    }

    /// DROP statements, links first so references never dangle.
    pub fn drop_statements(&self) -> Vec<String> {
        vec![
            format!("DROP TABLE IF EXISTS {}", self.links_table()),
            format!("DROP TABLE IF EXISTS {}", self.sentences_table()),
            format!("DROP TABLE IF EXISTS {}", self.freqs_table()),
        ]
    }

    /// DELETE statements, links first.
    pub fn clear_statements(&self) -> Vec<String> {
        vec![
            format!("DELETE FROM {}", self.links_table()),
            format!("DELETE FROM {}", self.sentences_table()),
            format!("DELETE FROM {}", self.freqs_table()),
        ]
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Create the corpus registry if it doesn't exist.
pub async fn ensure_registry(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(REGISTRY_DDL).execute(pool).await?;
    Ok(())
}

/// Register `schema` or verify it against an existing registration.
pub(crate) async fn register(conn: &mut SqliteConnection, schema: &CorpusSchema) -> Result<()> {
    let stored: Option<i64> = sqlx::query_scalar("SELECT pos_fields FROM corpora WHERE name = ?")
        .bind(schema.name())
        .fetch_optional(&mut *conn)
        .await?;

    match stored {
        Some(stored) if stored as usize != schema.pos_fields() => Err(StoreError::SchemaMismatch {
            corpus: schema.name().to_string(),
            stored: stored as usize,
            requested: schema.pos_fields(),
        }),
        Some(_) => Ok(()),
        None => {
            info!(corpus = schema.name(), pos_fields = schema.pos_fields(), "Registering corpus");
            sqlx::query("INSERT INTO corpora (name, pos_fields, created_at) VALUES (?, ?, ?)")
                .bind(schema.name())
                .bind(schema.pos_fields() as i64)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&mut *conn)
                .await?;
            Ok(())
        }
    }
}

pub(crate) async fn unregister(conn: &mut SqliteConnection, schema: &CorpusSchema) -> Result<()> {
    sqlx::query("DELETE FROM corpora WHERE name = ?")
        .bind(schema.name())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub(crate) async fn list(pool: &SqlitePool) -> Result<Vec<CorpusRecord>> {
    let records = sqlx::query_as::<_, CorpusRecord>(
        "SELECT name, pos_fields, created_at FROM corpora ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(records)
}

/// Execute a batch of DDL/DML statements on one connection.
pub(crate) async fn execute_all(conn: &mut SqliteConnection, statements: &[String]) -> Result<()> {
    for statement in statements {
        debug!(sql = %statement, "Executing schema statement");
        sqlx::query(statement).execute(&mut *conn).await?;
    }
    Ok(())
}
