//! Query helpers for the people collection.
//!
//! # Responsibility
//! - Describe match criteria, sort order, paging and field projection.
//! - Stay storage-agnostic; SQL translation lives in the repository.

pub mod person_query;
