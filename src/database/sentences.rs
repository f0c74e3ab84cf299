//! Sentence table and link index operations
//!
//! Sentences are append-only. Every counted token of a flushed sentence adds
//! one link row from its word key to the sentence, so a word used twice in a
//! sentence is linked twice. Concordance reads return each sentence once,
//! shortest first.

use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use super::error::{Result, StoreError};
use super::frequencies::{upsert_word, FrequencyOps};
use super::models::{SentenceCursor, SentencePage, SentenceRecord, WordKey};
use super::schema::CorpusSchema;
use super::Corpus;

/// What a sentence flush wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushOutcome {
    pub sentence_id: i64,
    pub links: usize,
}

/// Extension trait for sentence and concordance operations
pub trait SentenceOps {
    // Write path
    fn insert_sentence(&self, text: &str) -> impl std::future::Future<Output = Result<i64>> + Send;
    fn insert_link(&self, word_id: i64, sentence_id: i64) -> impl std::future::Future<Output = Result<()>> + Send;
    fn flush_sentence(&self, text: &str, keys: &[WordKey]) -> impl std::future::Future<Output = Result<FlushOutcome>> + Send;

    // Concordance
    fn select_sentences(&self, key: &WordKey, page_size: u32, after: Option<SentenceCursor>) -> impl std::future::Future<Output = Result<SentencePage>> + Send;
    fn stream_sentences<'a>(&'a self, key: &'a WordKey) -> BoxStream<'a, Result<String>>;

    // Diagnostics
    fn count_sentences(&self) -> impl std::future::Future<Output = Result<i64>> + Send;
    fn count_links(&self) -> impl std::future::Future<Output = Result<i64>> + Send;
}

impl SentenceOps for Corpus {
    // =========================================================================
    // Write Operations
    // =========================================================================

    async fn insert_sentence(&self, text: &str) -> Result<i64> {
        let mut conn = self.pool().acquire().await?;
        insert_sentence_row(&mut conn, self.schema(), text).await
    }

    async fn insert_link(&self, word_id: i64, sentence_id: i64) -> Result<()> {
        let mut conn = self.pool().acquire().await?;
        insert_link_row(&mut conn, self.schema(), word_id, sentence_id).await
    }

    /// Store a completed sentence with all of its key increments and links
    /// in one transaction. Either everything commits or nothing does.
    async fn flush_sentence(&self, text: &str, keys: &[WordKey]) -> Result<FlushOutcome> {
        for key in keys {
            self.schema().check_key(key)?;
        }

        let mut tx = self.pool().begin().await?;
        let sentence_id = insert_sentence_row(&mut tx, self.schema(), text).await?;
        for key in keys {
            let word_id = upsert_word(&mut tx, self.schema(), key).await?;
            insert_link_row(&mut tx, self.schema(), word_id, sentence_id).await?;
        }
        tx.commit().await?;

        debug!(corpus = self.name(), sentence_id, links = keys.len(), "Flushed sentence");
        Ok(FlushOutcome {
            sentence_id,
            links: keys.len(),
        })
    }

    // =========================================================================
    // Concordance Operations
    // =========================================================================

    /// Sentences containing `key`, ordered by length then id.
    async fn select_sentences(
        &self,
        key: &WordKey,
        page_size: u32,
        after: Option<SentenceCursor>,
    ) -> Result<SentencePage> {
        if page_size == 0 {
            return Err(StoreError::InvalidPageSize);
        }
        let Some(word_id) = self.word_id(key).await? else {
            return Ok(SentencePage::default());
        };

        let mut qb = concordance_query(self.schema(), word_id);
        if let Some(cursor) = after {
            qb.push(" AND (s.length, s.id) > (");
            qb.push_bind(cursor.length);
            qb.push(", ");
            qb.push_bind(cursor.id);
            qb.push(")");
        }
        qb.push(" ORDER BY s.length, s.id LIMIT ");
        qb.push_bind(i64::from(page_size) + 1);

        let mut sentences = qb
            .build_query_as::<SentenceRecord>()
            .fetch_all(self.pool())
            .await?;

        let next = if sentences.len() > page_size as usize {
            sentences.truncate(page_size as usize);
            sentences.last().map(SentenceCursor::from)
        } else {
            None
        };

        Ok(SentencePage { sentences, next })
    }

    /// Lazily yields the sentence texts of `key` in concordance order. The
    /// stream holds one pooled connection until it is dropped; call again to
    /// restart from the beginning.
    fn stream_sentences<'a>(&'a self, key: &'a WordKey) -> BoxStream<'a, Result<String>> {
        let stream = async_stream::try_stream! {
            if let Some(word_id) = self.word_id(key).await? {
                let mut qb = concordance_query(self.schema(), word_id);
                qb.push(" ORDER BY s.length, s.id");
                let mut rows = qb.build_query_as::<SentenceRecord>().fetch(self.pool());
                while let Some(record) = rows.try_next().await.map_err(StoreError::from)? {
                    yield record.sentence;
                }
            }
        };
        stream.boxed()
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    async fn count_sentences(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.schema().sentences_table()))
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }

    async fn count_links(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.schema().links_table()))
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

async fn insert_sentence_row(conn: &mut SqliteConnection, schema: &CorpusSchema, text: &str) -> Result<i64> {
    let length = text.chars().count() as i64;
    let id: i64 = sqlx::query_scalar(&format!(
        "INSERT INTO {} (sentence, length) VALUES (?, ?) RETURNING id",
        schema.sentences_table()
    ))
    .bind(text)
    .bind(length)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

async fn insert_link_row(
    conn: &mut SqliteConnection,
    schema: &CorpusSchema,
    word_id: i64,
    sentence_id: i64,
) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO {} (word_id, sentence_id) VALUES (?, ?)",
        schema.links_table()
    ))
    .bind(word_id)
    .bind(sentence_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// `SELECT DISTINCT` over the sentences linked to `word_id`, without ordering.
fn concordance_query(schema: &CorpusSchema, word_id: i64) -> QueryBuilder<'static, Sqlite> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT DISTINCT s.id, s.sentence, s.length FROM {} l JOIN {} s ON s.id = l.sentence_id WHERE l.word_id = ",
        schema.links_table(),
        schema.sentences_table()
    ));
    qb.push_bind(word_id);
    qb
}
