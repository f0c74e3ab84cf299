/// novel-freq - word frequency browser for Japanese text
///
/// Counts MeCab-segmented words by root form and part of speech, keeps the
/// sentences they occur in, and answers faceted frequency queries.

pub mod config;
pub mod core;
pub mod database;
pub mod ingestion;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
