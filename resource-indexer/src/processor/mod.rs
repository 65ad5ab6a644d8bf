//! Processor module for the resource indexer ingest.
//!
//! Transforms raw rows into search documents.

mod row_normalizer;

pub use row_normalizer::RowNormalizer;
