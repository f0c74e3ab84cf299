//! Crate test suite
//!
//! Database and ingestion tests run against a real SQLite file in a
//! temporary directory.
