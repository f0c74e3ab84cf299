//! SQLite Database Module
//!
//! Persistent word frequency counts, sentence concordance and the facet
//! queries over them. A [`Database`] owns the connection pool; a [`Corpus`]
//! binds it to one prefixed set of tables.

mod error;
mod facets;
mod frequencies;
mod models;
mod predicate;
mod schema;
mod selection;
mod sentences;

pub use error::{Result, StoreError};
pub use facets::FacetOps;
pub use frequencies::FrequencyOps;
pub use models::*;
pub use predicate::{CompareOp, Filter, Term};
pub use schema::{CorpusSchema, Dimension, TablePrefix, DEFAULT_POS_FIELDS};
pub use selection::{Facet, SelectionVector};
pub use sentences::{FlushOutcome, SentenceOps};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Default database file name inside the data directory.
pub const DATABASE_FILE: &str = "freqs.db";

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open (or create) `freqs.db` inside `data_dir`.
    pub async fn new(data_dir: &Path) -> Result<Self> {
        Self::open(&data_dir.join(DATABASE_FILE)).await
    }

    /// Open (or create) the database file at `db_path`.
    pub async fn open(db_path: &Path) -> Result<Self> {
        // Ensure directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path.display()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        // One connection serves the write path, the rest serve reads
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .min_connections(1)
            .connect_with(options)
            .await?;

        schema::ensure_registry(&pool).await?;
        info!(path = %db_path.display(), "Opened frequency database");

        Ok(Self {
            pool,
            path: db_path.to_path_buf(),
        })
    }

    /// Get the underlying pool for direct queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Registered corpora, ordered by name.
    pub async fn list_corpora(&self) -> Result<Vec<CorpusRecord>> {
        schema::list(&self.pool).await
    }

    /// Open a corpus, creating its tables if needed.
    pub async fn corpus(&self, name: &str, pos_fields: usize) -> Result<Corpus> {
        Corpus::open(self.clone(), name, pos_fields).await
    }

    /// Wait for in-flight work, checkpoint and close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(path = %self.path.display(), "Closed frequency database");
    }
}

// ============================================================================
// Corpus
// ============================================================================

/// One corpus: a frequency table, a sentence table and their link table.
#[derive(Clone)]
pub struct Corpus {
    db: Database,
    schema: CorpusSchema,
}

impl Corpus {
    /// Validate `name`, check or record the POS field count and create the
    /// tables.
    pub async fn open(db: Database, name: &str, pos_fields: usize) -> Result<Self> {
        let corpus = Self {
            db,
            schema: CorpusSchema::new(name, pos_fields)?,
        };
        corpus.create().await?;
        Ok(corpus)
    }

    pub fn schema(&self) -> &CorpusSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }

    /// Create the tables and indexes if they don't exist.
    pub async fn create(&self) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        schema::register(&mut tx, &self.schema).await?;
        schema::execute_all(&mut tx, &self.schema.create_statements()).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Remove every row, keeping the tables.
    pub async fn clear(&self) -> Result<()> {
        // Use transaction so links never outlive the rows they reference
        let mut tx = self.pool().begin().await?;
        schema::execute_all(&mut tx, &self.schema.clear_statements()).await?;
        tx.commit().await?;
        info!(corpus = self.name(), "Cleared corpus");
        Ok(())
    }

    /// Remove the tables and the registry entry.
    pub async fn drop_tables(&self) -> Result<()> {
        let mut tx = self.pool().begin().await?;
        schema::execute_all(&mut tx, &self.schema.drop_statements()).await?;
        schema::unregister(&mut tx, &self.schema).await?;
        tx.commit().await?;
        info!(corpus = self.name(), "Dropped corpus");
        Ok(())
    }
}
