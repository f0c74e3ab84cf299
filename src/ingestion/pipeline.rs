//! Ingestion pipeline
//!
//! Drives MeCab-formatted files through the segmenter into a corpus. A file
//! that cannot be opened or read is reported and skipped; storage errors end
//! the run.

use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use indicatif::ProgressBar;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::database::{Corpus, Result};

use super::mecab::{encoding_for_label, MecabLine, MecabReader, UnsupportedEncoding};
use super::segmenter::{Segmenter, SegmenterStats};
use super::token::{PunctuationBoundary, SentenceBoundary};

/// Ingestion options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Complete the pending sentence at every `EOS`.
    pub break_on_line_end: bool,
    /// Remove the corpus contents before the first file.
    pub clear_first: bool,
    /// Character encoding of the input files.
    pub encoding: &'static Encoding,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            break_on_line_end: true,
            clear_first: false,
            encoding: UTF_8,
        }
    }
}

impl TryFrom<&IngestConfig> for IngestOptions {
    type Error = UnsupportedEncoding;

    fn try_from(config: &IngestConfig) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            break_on_line_end: config.break_on_line_end,
            clear_first: config.clear_first,
            encoding: encoding_for_label(&config.encoding)?,
        })
    }
}

/// Result of ingesting a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Ingested { lines: u64, stats: SegmenterStats },
    /// Reading stopped part way; what was read before the failure is stored.
    Interrupted { lines: u64, stats: SegmenterStats, reason: String },
    Unreadable(String),
}

/// Summary of an ingestion run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub files_read: usize,
    pub files_failed: Vec<(PathBuf, String)>,
    pub lines: u64,
    pub tokens: u64,
    pub skipped_tokens: u64,
    pub sentences: u64,
}

impl IngestReport {
    pub fn record(&mut self, path: &Path, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Ingested { lines, stats } => {
                self.files_read += 1;
                self.lines += lines;
                self.tokens += stats.tokens;
                self.skipped_tokens += stats.skipped;
                self.sentences += stats.sentences;
            }
            FileOutcome::Interrupted { lines, stats, reason } => {
                self.record(path, FileOutcome::Ingested { lines, stats });
                self.files_failed.push((path.to_path_buf(), reason));
            }
            FileOutcome::Unreadable(reason) => {
                self.files_failed.push((path.to_path_buf(), reason));
            }
        }
    }
}

/// Reads MeCab output files into a corpus.
pub struct Ingester<'c, B = PunctuationBoundary> {
    corpus: &'c Corpus,
    options: IngestOptions,
    boundary: B,
    progress: Option<ProgressBar>,
}

impl<'c> Ingester<'c, PunctuationBoundary> {
    pub fn new(corpus: &'c Corpus, options: IngestOptions) -> Self {
        Self::with_boundary(corpus, options, PunctuationBoundary::default())
    }
}

impl<'c, B: SentenceBoundary + Clone> Ingester<'c, B> {
    pub fn with_boundary(corpus: &'c Corpus, options: IngestOptions, boundary: B) -> Self {
        Self {
            corpus,
            options,
            boundary,
            progress: None,
        }
    }

    /// Advance `progress` by one per file.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Ingest every file in order, skipping unreadable ones.
    pub async fn ingest_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<IngestReport> {
        if self.options.clear_first {
            self.corpus.clear().await?;
        }

        let mut report = IngestReport::default();
        for path in paths {
            let path = path.as_ref();
            if let Some(pb) = &self.progress {
                pb.set_message(path.display().to_string());
            }
            let outcome = self.ingest_file(path).await?;
            report.record(path, outcome);
            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        info!(
            corpus = self.corpus.name(),
            files = report.files_read,
            failed = report.files_failed.len(),
            tokens = report.tokens,
            sentences = report.sentences,
            "Ingestion finished"
        );
        Ok(report)
    }

    /// Ingest one file. Sentences never span files.
    pub async fn ingest_file(&self, path: &Path) -> Result<FileOutcome> {
        info!(path = %path.display(), encoding = self.options.encoding.name(), "Reading file");
        let file = match File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to open file");
                return Ok(FileOutcome::Unreadable(e.to_string()));
            }
        };

        let pos_fields = self.corpus.schema().pos_fields();
        let mut reader =
            MecabReader::new(BufReader::new(file), pos_fields).with_encoding(self.options.encoding);
        let mut segmenter = Segmenter::with_boundary(self.corpus, self.boundary.clone());
        let mut read_error = None;

        loop {
            match reader.next_line().await {
                Ok(Some(Ok(MecabLine::Token(token)))) => segmenter.push(Ok(token)).await?,
                Ok(Some(Ok(MecabLine::EndOfLine))) => {
                    if self.options.break_on_line_end {
                        segmenter.flush().await?;
                    }
                }
                Ok(Some(Err(e))) => segmenter.push(Err(e)).await?,
                Ok(None) => break,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read file");
                    read_error = Some(e.to_string());
                    break;
                }
            }
        }

        // Keep the sentences read before an I/O failure
        let stats = segmenter.finish().await?;
        let lines = reader.lines_read();
        Ok(match read_error {
            Some(reason) if lines == 0 => FileOutcome::Unreadable(reason),
            Some(reason) => FileOutcome::Interrupted { lines, stats, reason },
            None => FileOutcome::Ingested { lines, stats },
        })
    }
}
