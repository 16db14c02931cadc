//! Person domain model.
//!
//! # Responsibility
//! - Define the single record type stored in the people collection.
//! - Provide construction and mutation helpers used by service flows.
//!
//! # Invariants
//! - `id` is stable and never reused for another person.
//! - `name` must be non-empty after trimming.
//! - `favorite_foods` keeps caller order; duplicates are allowed.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one stored person.
pub type PersonId = Uuid;

/// Validation failures for person records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonValidationError {
    /// `name` is empty or whitespace only.
    EmptyName,
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "person name must not be empty"),
        }
    }
}

impl Error for PersonValidationError {}

/// One stored person document.
///
/// Serialized with the collection's external field names (`_id`,
/// `favoriteFoods`, ...) so JSON exports keep the document shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(rename = "_id")]
    pub id: PersonId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
    /// Epoch milliseconds. Assigned by storage, `None` before first insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Epoch milliseconds. Bumped by storage on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Person {
    /// Creates a person with a generated stable ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a person with a caller-provided ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(id: PersonId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            age: None,
            favorite_foods: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_favorite_foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorite_foods = foods.into_iter().map(Into::into).collect();
        self
    }

    /// Appends one food to the end of `favorite_foods`.
    pub fn add_favorite_food(&mut self, food: impl Into<String>) {
        self.favorite_foods.push(food.into());
    }

    /// Checks record invariants before persistence.
    pub fn validate(&self) -> Result<(), PersonValidationError> {
        if self.name.trim().is_empty() {
            return Err(PersonValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Input shape for bulk creation, without identity or timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub name: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl From<NewPerson> for Person {
    fn from(value: NewPerson) -> Self {
        Self {
            age: value.age,
            favorite_foods: value.favorite_foods,
            ..Person::new(value.name)
        }
    }
}
