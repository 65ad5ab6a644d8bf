//! This module defines the core data structures used across the resource indexer.

pub mod alias_map;
pub mod document;
pub mod schema;
pub mod validation;
