//! Ingestion
//!
//! Turns analysed text into stored sentences and word counts:
//! MeCab output is decoded into [`Token`]s, grouped into sentences by a
//! [`Segmenter`] and flushed to a corpus one sentence per transaction.

pub mod mecab;
pub mod pipeline;
pub mod segmenter;
pub mod token;

pub use mecab::{
    encoding_for_label, parse_encoded_line, parse_line, MecabLine, MecabReader, UnsupportedEncoding,
};
pub use pipeline::{FileOutcome, IngestOptions, IngestReport, Ingester};
pub use segmenter::{PendingSentence, Segmenter, SegmenterStats};
pub use token::{DecodeError, PunctuationBoundary, SentenceBoundary, Token};
