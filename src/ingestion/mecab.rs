//! MeCab text output adapter
//!
//! Reads the default output format of `mecab`:
//!
//! ```text
//! 勉強\t名詞,サ変接続,*,*,*,*,勉強,ベンキョウ,ベンキョー
//! EOS
//! ```
//!
//! The first `pos_fields` features are the POS tags and the next one is the
//! base form. `EOS` ends an input line.
//!
//! Input defaults to UTF-8. Dictionaries built for Shift_JIS or EUC-JP make
//! MeCab print in that encoding, so the reader decodes with any
//! ASCII-compatible `encoding_rs` encoding.

use encoding_rs::{Encoding, UTF_8};
use miette::Diagnostic;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::token::{DecodeError, Token};

const END_OF_LINE: &str = "EOS";

/// An encoding label the reader cannot use.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Unsupported input encoding '{0}'")]
#[diagnostic(
    code(novel_freq::unsupported_encoding),
    help("Use a WHATWG label of an ASCII-compatible encoding such as utf-8, shift_jis or euc-jp")
)]
pub struct UnsupportedEncoding(pub String);

/// Resolve a WHATWG encoding label.
///
/// Lines are split on the `\n` byte, so UTF-16 and ISO-2022-JP are refused.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, UnsupportedEncoding> {
    Encoding::for_label(label.trim().as_bytes())
        .filter(|encoding| encoding.is_ascii_compatible())
        .ok_or_else(|| UnsupportedEncoding(label.to_string()))
}

/// One decoded line of MeCab output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MecabLine {
    Token(Token),
    EndOfLine,
}

/// Decode one line of UTF-8 MeCab output. Blank lines yield `None`.
pub fn parse_line(bytes: &[u8], line: u64, pos_fields: usize) -> Result<Option<MecabLine>, DecodeError> {
    parse_encoded_line(bytes, line, pos_fields, UTF_8)
}

/// Decode one line of MeCab output in `encoding`.
pub fn parse_encoded_line(
    bytes: &[u8],
    line: u64,
    pos_fields: usize,
    encoding: &'static Encoding,
) -> Result<Option<MecabLine>, DecodeError> {
    let text = encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or(DecodeError::Undecodable {
            line,
            encoding: encoding.name(),
        })?;
    let text = text.trim_end_matches(['\n', '\r']);
    if text.trim().is_empty() {
        return Ok(None);
    }
    if text == END_OF_LINE {
        return Ok(Some(MecabLine::EndOfLine));
    }

    let (surface, features) = text
        .split_once('\t')
        .ok_or(DecodeError::MissingFeatures { line })?;
    let features: Vec<&str> = features.split(',').collect();
    if features.len() < pos_fields {
        return Err(DecodeError::TooFewFeatures {
            line,
            expected: pos_fields,
            found: features.len(),
        });
    }
    if surface.is_empty() {
        return Ok(None);
    }

    let mut token = Token::new(surface, features[..pos_fields].iter().copied());
    if let Some(base) = features.get(pos_fields) {
        token = token.with_base_form(*base);
    }
    Ok(Some(MecabLine::Token(token)))
}

/// Streams decoded lines from a buffered reader.
pub struct MecabReader<R> {
    inner: R,
    pos_fields: usize,
    encoding: &'static Encoding,
    buf: Vec<u8>,
    line: u64,
}

impl<R: AsyncBufRead + Unpin> MecabReader<R> {
    pub fn new(inner: R, pos_fields: usize) -> Self {
        Self {
            inner,
            pos_fields,
            encoding: UTF_8,
            buf: Vec::new(),
            line: 0,
        }
    }

    /// Decode input in `encoding` instead of UTF-8.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Number of lines read so far.
    pub fn lines_read(&self) -> u64 {
        self.line
    }

    /// Next non-blank line. The outer `Result` carries I/O failures, the
    /// inner one decode failures of a single line.
    pub async fn next_line(&mut self) -> std::io::Result<Option<Result<MecabLine, DecodeError>>> {
        loop {
            self.buf.clear();
            if self.inner.read_until(b'\n', &mut self.buf).await? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let mut bytes = self.buf.as_slice();
            if self.line == 1 {
                if let Some((bom_encoding, len)) = Encoding::for_bom(bytes) {
                    if bom_encoding == self.encoding {
                        bytes = &bytes[len..];
                    }
                }
            }
            match parse_encoded_line(bytes, self.line, self.pos_fields, self.encoding) {
                Ok(None) => continue,
                Ok(Some(line)) => return Ok(Some(Ok(line))),
                Err(e) => return Ok(Some(Err(e))),
            }
        }
    }
}
