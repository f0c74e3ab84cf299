//! Frequency table operations
//!
//! Upsert-or-increment of word keys and lookups by full key.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::error::Result;
use super::models::WordKey;
use super::schema::CorpusSchema;
use super::Corpus;

/// Extension trait for frequency table operations
pub trait FrequencyOps {
    fn insert_or_increment(&self, key: &WordKey) -> impl std::future::Future<Output = Result<i64>> + Send;
    fn word_id(&self, key: &WordKey) -> impl std::future::Future<Output = Result<Option<i64>>> + Send;
    fn frequency_of(&self, key: &WordKey) -> impl std::future::Future<Output = Result<i64>> + Send;
    fn count_words(&self) -> impl std::future::Future<Output = Result<i64>> + Send;
}

impl FrequencyOps for Corpus {
    /// Insert `key` with a count of one, or add one to its existing count.
    /// Returns the row id.
    async fn insert_or_increment(&self, key: &WordKey) -> Result<i64> {
        let mut conn = self.pool().acquire().await?;
        upsert_word(&mut conn, self.schema(), key).await
    }

    async fn word_id(&self, key: &WordKey) -> Result<Option<i64>> {
        self.schema().check_key(key)?;
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT id FROM {}", self.schema().freqs_table()));
        push_key_match(&mut qb, self.schema(), key);
        let id = qb.build_query_scalar::<i64>().fetch_optional(self.pool()).await?;
        Ok(id)
    }

    /// Current count of `key`, zero if it was never observed.
    async fn frequency_of(&self, key: &WordKey) -> Result<i64> {
        self.schema().check_key(key)?;
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT freq FROM {}", self.schema().freqs_table()));
        push_key_match(&mut qb, self.schema(), key);
        let freq = qb.build_query_scalar::<i64>().fetch_optional(self.pool()).await?;
        Ok(freq.unwrap_or(0))
    }

    async fn count_words(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.schema().freqs_table()))
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

/// Upsert on an existing connection or transaction.
///
/// A unique-constraint conflict on the key columns turns the insert into an
/// increment, so concurrent or repeated inserts of one key never fail.
pub(crate) async fn upsert_word(
    conn: &mut SqliteConnection,
    schema: &CorpusSchema,
    key: &WordKey,
) -> Result<i64> {
    schema.check_key(key)?;
    let columns = schema.key_columns();

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "INSERT INTO {} (freq, {columns}) VALUES (1",
        schema.freqs_table()
    ));
    for value in key.values() {
        qb.push(", ");
        qb.push_bind(value.to_string());
    }
    qb.push(format!(
        ") ON CONFLICT ({columns}) DO UPDATE SET freq = freq + 1 RETURNING id"
    ));

    let id = qb.build_query_scalar::<i64>().fetch_one(&mut *conn).await?;
    Ok(id)
}

/// Appends ` WHERE word = ? AND pos0 = ? ...` for every key field.
fn push_key_match(qb: &mut QueryBuilder<'_, Sqlite>, schema: &CorpusSchema, key: &WordKey) {
    for (dimension, value) in schema.all_dimensions().zip(key.values()) {
        qb.push(if dimension.index() == 0 { " WHERE " } else { " AND " });
        qb.push(dimension.column());
        qb.push(" = ");
        qb.push_bind(value.to_string());
    }
}
