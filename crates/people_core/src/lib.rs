//! Core domain logic for the people store.
//! This crate owns the `Person` record, its storage and its use-case API.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use config::AppConfig;
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LoggingError};
pub use model::person::{NewPerson, Person, PersonId, PersonValidationError};
pub use query::person_query::{
    PersonField, PersonFilter, PersonQuery, ProjectedPerson, Projection, SortField, SortKey,
    SortOrder,
};
pub use repo::person_repo::{
    DeleteOutcome, PersonPatch, PersonRepository, RepoError, RepoResult, SqlitePersonRepository,
};
pub use service::person_service::{PersonService, DEFAULT_AGE_TO_SET, DEFAULT_FOOD_TO_ADD};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
