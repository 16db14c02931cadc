//! Domain model for the people collection.
//!
//! # Responsibility
//! - Define the canonical `Person` record shared by repository and service.
//!
//! # Invariants
//! - Every person is identified by a stable `PersonId`.
//! - `name` is the only required attribute.

pub mod person;
