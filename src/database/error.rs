//! Error types for the frequency store.
//!
//! Storage failures are wrapped from `sqlx`; everything else is a caller
//! contract violation detected before a statement is sent to SQLite.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the frequency, sentence and facet stores.
#[derive(Error, Debug, Diagnostic)]
pub enum StoreError {
    // =========================================================================
    // Storage Errors
    // =========================================================================

    /// The backing SQLite database could not be opened or a statement failed.
    #[error("Database error: {0}")]
    #[diagnostic(code(novel_freq::database))]
    Database(#[from] sqlx::Error),

    /// The corpus was created with a different number of POS fields.
    #[error("Corpus '{corpus}' stores {stored} POS fields, but {requested} were requested")]
    #[diagnostic(
        code(novel_freq::schema_mismatch),
        help("Drop the corpus or open it with the POS field count it was created with")
    )]
    SchemaMismatch {
        corpus: String,
        stored: usize,
        requested: usize,
    },

    // =========================================================================
    // Caller Input Errors
    // =========================================================================

    /// Corpus names become table prefixes and must be plain identifiers.
    #[error("Invalid corpus name '{0}': expected [A-Za-z_][A-Za-z0-9_]* of at most 64 characters")]
    #[diagnostic(code(novel_freq::invalid_prefix))]
    InvalidTablePrefix(String),

    /// A dimension index outside `0..dimensions`.
    #[error("Dimension {index} is out of range: the corpus has {dimensions} dimensions")]
    #[diagnostic(
        code(novel_freq::dimension_out_of_range),
        help("Dimension 0 is the word, dimensions 1.. are the POS fields")
    )]
    DimensionOutOfRange { index: usize, dimensions: usize },

    /// A selection vector whose length differs from the corpus dimensions.
    #[error("Selection has {got} entries, expected {expected}")]
    #[diagnostic(code(novel_freq::selection_arity))]
    SelectionArity { expected: usize, got: usize },

    /// A word key whose POS tuple length differs from the corpus schema.
    #[error("Word key has {got} POS fields, expected {expected}")]
    #[diagnostic(code(novel_freq::key_arity))]
    KeyArity { expected: usize, got: usize },

    /// A continuation cursor that does not belong to the current selection.
    #[error("Cursor carries {got} grouped values, but the selection groups {expected} dimensions")]
    #[diagnostic(
        code(novel_freq::invalid_cursor),
        help("Cursors are only valid for the selection that produced them")
    )]
    InvalidCursor { expected: usize, got: usize },

    /// Page sizes must be at least one row.
    #[error("Page size must be at least 1")]
    #[diagnostic(code(novel_freq::invalid_page_size))]
    InvalidPageSize,
}

impl StoreError {
    /// Returns true for errors caused by the caller rather than the store.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, StoreError::Database(_) | StoreError::SchemaMismatch { .. })
    }
}
