//! Sentence segmentation
//!
//! Buffers tokens until a sentence boundary, then flushes the sentence text
//! and its word keys to the corpus as one transaction.

use tracing::{debug, warn};

use crate::database::{Corpus, Result, SentenceOps, WordKey};

use super::token::{DecodeError, PunctuationBoundary, SentenceBoundary, Token};

/// Tokens collected since the last flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSentence {
    pub text: String,
    pub keys: Vec<WordKey>,
}

impl PendingSentence {
    /// No counted token has been buffered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn clear(&mut self) {
        self.text.clear();
        self.keys.clear();
    }
}

/// Running totals of one segmenter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmenterStats {
    /// Tokens counted in the frequency table (boundaries excluded).
    pub tokens: u64,
    /// Tokens dropped because they could not be decoded or had the wrong shape.
    pub skipped: u64,
    /// Sentences stored.
    pub sentences: u64,
}

/// Groups a token stream into sentences and writes them to a corpus.
pub struct Segmenter<'c, B = PunctuationBoundary> {
    corpus: &'c Corpus,
    boundary: B,
    pending: PendingSentence,
    stats: SegmenterStats,
}

impl<'c> Segmenter<'c, PunctuationBoundary> {
    pub fn new(corpus: &'c Corpus) -> Self {
        Self::with_boundary(corpus, PunctuationBoundary::default())
    }
}

impl<'c, B: SentenceBoundary> Segmenter<'c, B> {
    pub fn with_boundary(corpus: &'c Corpus, boundary: B) -> Self {
        Self {
            corpus,
            boundary,
            pending: PendingSentence::default(),
            stats: SegmenterStats::default(),
        }
    }

    pub fn pending(&self) -> &PendingSentence {
        &self.pending
    }

    pub fn stats(&self) -> SegmenterStats {
        self.stats
    }

    /// Feed one token. Undecodable tokens are logged and skipped; a boundary
    /// token completes the sentence and triggers a flush.
    pub async fn push(&mut self, token: std::result::Result<Token, DecodeError>) -> Result<()> {
        let token = match token {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable token");
                self.stats.skipped += 1;
                return Ok(());
            }
        };

        let expected = self.corpus.schema().pos_fields();
        if token.pos.len() != expected {
            warn!(
                surface = %token.surface,
                found = token.pos.len(),
                expected,
                "Skipping token with wrong number of POS fields"
            );
            self.stats.skipped += 1;
            return Ok(());
        }

        self.pending.text.push_str(&token.surface);
        if self.boundary.is_boundary(&token) {
            self.flush().await?;
        } else {
            self.pending.keys.push(token.word_key());
        }
        Ok(())
    }

    /// Store the buffered sentence, if it holds any counted token, and reset
    /// the buffer. Returns whether a sentence was written.
    pub async fn flush(&mut self) -> Result<bool> {
        if self.pending.is_empty() {
            if !self.pending.text.is_empty() {
                debug!(text = %self.pending.text, "Discarding sentence without words");
            }
            self.pending.clear();
            return Ok(false);
        }

        self.corpus
            .flush_sentence(&self.pending.text, &self.pending.keys)
            .await?;
        self.stats.tokens += self.pending.keys.len() as u64;
        self.stats.sentences += 1;
        self.pending.clear();
        Ok(true)
    }

    /// Flush whatever is still buffered and return the totals.
    pub async fn finish(mut self) -> Result<SegmenterStats> {
        self.flush().await?;
        Ok(self.stats)
    }
}
