//! Person use-case service.
//!
//! # Responsibility
//! - Provide the collection's create/read/update/delete entry points.
//! - Delegate persistence to repository implementations.
//! - Report every failure to the caller and to the log, never swallow it.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Log events carry ids and counts only, never names or foods.

use crate::model::person::{NewPerson, Person, PersonId};
use crate::query::person_query::{PersonFilter, PersonQuery, ProjectedPerson, Projection};
use crate::repo::person_repo::{
    DeleteOutcome, PersonPatch, PersonRepository, RepoError, RepoResult,
};
use log::{error, info};
use std::time::Instant;

/// Food appended by `add_favorite_food` when callers use the default.
pub const DEFAULT_FOOD_TO_ADD: &str = "hamburger";
/// Age written by `set_age_by_name` when callers use the default.
pub const DEFAULT_AGE_TO_SET: i64 = 20;

/// Use-case service wrapper for person operations.
pub struct PersonService<R: PersonRepository> {
    repo: R,
}

impl<R: PersonRepository> PersonService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists one person and returns the stored record.
    pub fn create_and_save_person(&self, person: Person) -> RepoResult<Person> {
        let id = person.id;
        observe("person_create", || self.repo.insert_one(&person)).map(|stored| {
            info!("event=person_create module=service status=ok person_id={id}");
            stored
        })
    }

    /// Persists a batch of people. Either all of them are stored or none.
    pub fn create_many_people(&self, people: Vec<NewPerson>) -> RepoResult<Vec<Person>> {
        let people: Vec<Person> = people.into_iter().map(Person::from).collect();
        observe("person_create_many", || self.repo.insert_many(&people)).map(|stored| {
            info!(
                "event=person_create_many module=service status=ok count={}",
                stored.len()
            );
            stored
        })
    }

    /// Lists every stored person in insertion order.
    pub fn find_all_people(&self) -> RepoResult<Vec<Person>> {
        observe("person_find_all", || self.repo.find_all())
    }

    /// Lists people whose name matches exactly.
    pub fn find_people_by_name(&self, name: &str) -> RepoResult<Vec<Person>> {
        let query = PersonQuery::new().filter(PersonFilter::by_name(name));
        observe("person_find_by_name", || self.repo.find(&query))
    }

    /// Returns the earliest stored person who lists `food` as a favorite.
    pub fn find_one_by_food(&self, food: &str) -> RepoResult<Option<Person>> {
        observe("person_find_one_by_food", || {
            self.repo.find_one(&PersonFilter::by_favorite_food(food))
        })
    }

    pub fn find_person_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        observe("person_find_by_id", || self.repo.find_by_id(id))
    }

    /// Loads a person, applies `edit` in memory, then saves the result.
    ///
    /// # Errors
    /// - `NotFound` when no person has `id`.
    /// - `Validation` when the edited record is invalid; nothing is written.
    pub fn find_edit_then_save<F>(&self, id: PersonId, edit: F) -> RepoResult<Person>
    where
        F: FnOnce(&mut Person),
    {
        observe("person_edit", || {
            let mut person = self.repo.find_by_id(id)?.ok_or(RepoError::NotFound(id))?;
            edit(&mut person);
            // The closure must not re-key the record.
            person.id = id;
            self.repo.save(&person)
        })
    }

    /// Appends `food` to the person's favorites via read-modify-write.
    pub fn add_favorite_food(&self, id: PersonId, food: &str) -> RepoResult<Person> {
        self.find_edit_then_save(id, |person| person.add_favorite_food(food))
    }

    /// Updates the first person named `name` and returns the updated record.
    ///
    /// Returns `Ok(None)` when nobody matches.
    pub fn find_and_update(&self, name: &str, patch: &PersonPatch) -> RepoResult<Option<Person>> {
        observe("person_find_and_update", || {
            self.repo
                .find_one_and_update(&PersonFilter::by_name(name), patch)
        })
    }

    pub fn set_age_by_name(&self, name: &str, age: i64) -> RepoResult<Option<Person>> {
        self.find_and_update(name, &PersonPatch::set_age(age))
    }

    /// Removes one person, returning the removed record if it existed.
    pub fn remove_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        observe("person_remove", || self.repo.delete_by_id(id)).map(|removed| {
            info!(
                "event=person_remove module=service status=ok person_id={id} found={}",
                removed.is_some()
            );
            removed
        })
    }

    /// Removes every person matching `filter`.
    pub fn remove_many_people(&self, filter: &PersonFilter) -> RepoResult<DeleteOutcome> {
        observe("person_remove_many", || self.repo.delete_many(filter)).map(|outcome| {
            info!(
                "event=person_remove_many module=service status=ok deleted={}",
                outcome.deleted_count
            );
            outcome
        })
    }

    pub fn remove_people_named(&self, name: &str) -> RepoResult<DeleteOutcome> {
        self.remove_many_people(&PersonFilter::by_name(name))
    }

    /// Runs a filter/sort/limit query and projects each result.
    pub fn query_chain(
        &self,
        query: &PersonQuery,
        projection: &Projection,
    ) -> RepoResult<Vec<ProjectedPerson>> {
        let people = observe("person_query", || self.repo.find(query))?;
        Ok(people
            .into_iter()
            .map(|person| projection.apply(person))
            .collect())
    }

    pub fn count_people(&self, filter: &PersonFilter) -> RepoResult<u64> {
        observe("person_count", || self.repo.count(filter))
    }
}

fn observe<T, F>(event: &str, operation: F) -> RepoResult<T>
where
    F: FnOnce() -> RepoResult<T>,
{
    let started_at = Instant::now();
    let result = operation();
    if let Err(err) = &result {
        error!(
            "event={event} module=service status=error duration_ms={} error_code={}",
            started_at.elapsed().as_millis(),
            err.code()
        );
    }
    result
}
