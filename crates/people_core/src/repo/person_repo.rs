//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over the `people` collection.
//! - Keep SQL details (food list table, filter translation) inside core.
//!
//! # Invariants
//! - Write paths call `Person::validate()` before SQL mutations.
//! - Multi-statement writes run in one transaction; failures leave no
//!   partial record behind.
//! - Read paths reject invalid persisted state instead of masking it.
//! - "First match" always means earliest inserted (`rowid` order).

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::person::{Person, PersonId, PersonValidationError};
use crate::query::person_query::{PersonFilter, PersonQuery, SortField, SortOrder};
use log::{debug, error};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const PERSON_SELECT_SQL: &str = "SELECT
    p.uuid AS uuid,
    p.name AS name,
    p.age AS age,
    p.created_at AS created_at,
    p.updated_at AS updated_at
FROM people p";

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("people", &["uuid", "name", "age", "created_at", "updated_at"]),
    ("person_foods", &["person_uuid", "position", "food"]),
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for person persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(PersonValidationError),
    Db(DbError),
    NotFound(PersonId),
    DuplicateId(PersonId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::Db(_) => "db_error",
            Self::NotFound(_) => "not_found",
            Self::DuplicateId(_) => "duplicate_id",
            Self::InvalidData(_) => "invalid_data",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
            Self::MissingRequiredTable(_) => "missing_table",
            Self::MissingRequiredColumn { .. } => "missing_column",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::DuplicateId(id) => write!(f, "person already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted person data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PersonValidationError> for RepoError {
    fn from(value: PersonValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Partial field update for conditional updates.
///
/// Only `Some` fields are written. `age: Some(None)` clears the age.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub age: Option<Option<i64>>,
    pub favorite_foods: Option<Vec<String>>,
}

impl PersonPatch {
    pub fn set_age(age: i64) -> Self {
        Self {
            age: Some(Some(age)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && self.favorite_foods.is_none()
    }

    /// Applies set fields onto `person` in place.
    pub fn apply_to(&self, person: &mut Person) {
        if let Some(name) = self.name.as_ref() {
            person.name = name.clone();
        }
        if let Some(age) = self.age {
            person.age = age;
        }
        if let Some(foods) = self.favorite_foods.as_ref() {
            person.favorite_foods = foods.clone();
        }
    }
}

/// Summary returned by bulk deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}

/// Repository interface for person CRUD operations.
pub trait PersonRepository {
    /// Inserts one person and returns the stored record.
    fn insert_one(&self, person: &Person) -> RepoResult<Person>;
    /// Inserts all people atomically, returning stored records in input order.
    fn insert_many(&self, people: &[Person]) -> RepoResult<Vec<Person>>;
    /// Returns every record in insertion order.
    fn find_all(&self) -> RepoResult<Vec<Person>>;
    /// Runs a filtered, sorted and paged query.
    fn find(&self, query: &PersonQuery) -> RepoResult<Vec<Person>>;
    /// Returns the earliest inserted record matching `filter`.
    fn find_one(&self, filter: &PersonFilter) -> RepoResult<Option<Person>>;
    fn find_by_id(&self, id: PersonId) -> RepoResult<Option<Person>>;
    /// Replaces an existing record by id.
    fn save(&self, person: &Person) -> RepoResult<Person>;
    /// Patches the first match and returns it after the update.
    ///
    /// An empty patch returns the match unchanged without writing.
    fn find_one_and_update(
        &self,
        filter: &PersonFilter,
        patch: &PersonPatch,
    ) -> RepoResult<Option<Person>>;
    /// Removes one record and returns it as it was before removal.
    fn delete_by_id(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn delete_many(&self, filter: &PersonFilter) -> RepoResult<DeleteOutcome>;
    fn count(&self, filter: &PersonFilter) -> RepoResult<u64>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// Rejects connections that were not opened through `db::open_db*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn insert_one(&self, person: &Person) -> RepoResult<Person> {
        person.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let stored = insert_person(&tx, person, now_epoch_ms())?;
        tx.commit()?;

        debug!("event=person_insert module=repo status=ok count=1");
        Ok(stored)
    }

    fn insert_many(&self, people: &[Person]) -> RepoResult<Vec<Person>> {
        for person in people {
            person.validate()?;
        }

        let now = now_epoch_ms();
        let tx = self.conn.unchecked_transaction()?;
        let mut stored = Vec::with_capacity(people.len());
        for person in people {
            stored.push(insert_person(&tx, person, now)?);
        }
        tx.commit()?;

        debug!(
            "event=person_insert module=repo status=ok count={}",
            stored.len()
        );
        Ok(stored)
    }

    fn find_all(&self) -> RepoResult<Vec<Person>> {
        self.find(&PersonQuery::default())
    }

    fn find(&self, query: &PersonQuery) -> RepoResult<Vec<Person>> {
        let mut sql = format!("{PERSON_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        push_filter_sql(&query.filter, &mut sql, &mut bind_values);

        sql.push_str(" ORDER BY ");
        for key in &query.sort {
            let column = match key.field {
                SortField::Name => "p.name",
                SortField::Age => "p.age",
                SortField::CreatedAt => "p.created_at",
            };
            let direction = match key.order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            sql.push_str(&format!("{column} {direction}, "));
        }
        sql.push_str("p.rowid ASC");

        match query.effective_limit() {
            Some(limit) => {
                sql.push_str(" LIMIT ?");
                bind_values.push(Value::Integer(i64::from(limit)));
                if query.skip > 0 {
                    sql.push_str(" OFFSET ?");
                    bind_values.push(Value::Integer(i64::from(query.skip)));
                }
            }
            None if query.skip > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.skip)));
            }
            None => {}
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_person_row(self.conn, row)?);
        }

        Ok(people)
    }

    fn find_one(&self, filter: &PersonFilter) -> RepoResult<Option<Person>> {
        match first_match_id(self.conn, filter)? {
            Some(id) => load_person(self.conn, id),
            None => Ok(None),
        }
    }

    fn find_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        load_person(self.conn, id)
    }

    fn save(&self, person: &Person) -> RepoResult<Person> {
        person.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let stored = update_person(&tx, person)?;
        tx.commit()?;

        Ok(stored)
    }

    fn find_one_and_update(
        &self,
        filter: &PersonFilter,
        patch: &PersonPatch,
    ) -> RepoResult<Option<Person>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(id) = first_match_id(&tx, filter)? else {
            return Ok(None);
        };
        let Some(mut person) = load_person(&tx, id)? else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(person));
        }

        patch.apply_to(&mut person);
        person.validate()?;
        let stored = update_person(&tx, &person)?;
        tx.commit()?;

        Ok(Some(stored))
    }

    fn delete_by_id(&self, id: PersonId) -> RepoResult<Option<Person>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(person) = load_person(&tx, id)? else {
            return Ok(None);
        };

        let id_text = id.to_string();
        tx.execute(
            "DELETE FROM person_foods WHERE person_uuid = ?1;",
            [id_text.as_str()],
        )?;
        tx.execute("DELETE FROM people WHERE uuid = ?1;", [id_text.as_str()])?;
        tx.commit()?;

        Ok(Some(person))
    }

    fn delete_many(&self, filter: &PersonFilter) -> RepoResult<DeleteOutcome> {
        let mut matched_sql = String::from("SELECT p.uuid FROM people p WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        push_filter_sql(filter, &mut matched_sql, &mut bind_values);

        let tx = self.conn.unchecked_transaction()?;
        // Resolve matches once: the food filter reads `person_foods`, which
        // the deletes below remove.
        let matched_ids: Vec<String> = {
            let mut stmt = tx.prepare(&matched_sql)?;
            let rows = stmt.query_map(params_from_iter(bind_values), |row| row.get(0))?;
            rows.collect::<Result<_, _>>()?
        };

        let mut deleted = 0_u64;
        for id_text in &matched_ids {
            tx.execute(
                "DELETE FROM person_foods WHERE person_uuid = ?1;",
                [id_text.as_str()],
            )?;
            let removed = tx.execute("DELETE FROM people WHERE uuid = ?1;", [id_text.as_str()])?;
            deleted += removed as u64;
        }
        tx.commit()?;

        Ok(DeleteOutcome {
            deleted_count: deleted,
        })
    }

    fn count(&self, filter: &PersonFilter) -> RepoResult<u64> {
        let mut sql = String::from("SELECT COUNT(*) FROM people p WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();
        push_filter_sql(filter, &mut sql, &mut bind_values);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }
}

fn push_filter_sql(filter: &PersonFilter, sql: &mut String, bind_values: &mut Vec<Value>) {
    if let Some(name) = filter.name.as_ref() {
        sql.push_str(" AND p.name = ?");
        bind_values.push(Value::Text(name.clone()));
    }

    if let Some(food) = filter.favorite_food.as_ref() {
        sql.push_str(
            " AND EXISTS (
                SELECT 1
                FROM person_foods f
                WHERE f.person_uuid = p.uuid
                  AND f.food = ?
            )",
        );
        bind_values.push(Value::Text(food.clone()));
    }

    if let Some(min_age) = filter.min_age {
        sql.push_str(" AND p.age IS NOT NULL AND p.age >= ?");
        bind_values.push(Value::Integer(min_age));
    }

    if let Some(max_age) = filter.max_age {
        sql.push_str(" AND p.age IS NOT NULL AND p.age <= ?");
        bind_values.push(Value::Integer(max_age));
    }
}

fn first_match_id(conn: &Connection, filter: &PersonFilter) -> RepoResult<Option<PersonId>> {
    let mut sql = String::from("SELECT p.uuid FROM people p WHERE 1 = 1");
    let mut bind_values: Vec<Value> = Vec::new();
    push_filter_sql(filter, &mut sql, &mut bind_values);
    sql.push_str(" ORDER BY p.rowid ASC LIMIT 1");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    if let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        return Ok(Some(parse_uuid(&uuid_text)?));
    }

    Ok(None)
}

fn load_person(conn: &Connection, id: PersonId) -> RepoResult<Option<Person>> {
    let mut stmt = conn.prepare(&format!("{PERSON_SELECT_SQL} WHERE p.uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_person_row(conn, row)?));
    }

    Ok(None)
}

fn insert_person(conn: &Connection, person: &Person, now: i64) -> RepoResult<Person> {
    let id_text = person.id.to_string();
    if person_exists(conn, &id_text)? {
        error!("event=person_insert module=repo status=error error_code=duplicate_id");
        return Err(RepoError::DuplicateId(person.id));
    }

    let created_at = person.created_at.unwrap_or(now);
    conn.execute(
        "INSERT INTO people (uuid, name, age, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![id_text, person.name.as_str(), person.age, created_at, now],
    )?;
    write_foods(conn, &id_text, &person.favorite_foods)?;

    Ok(Person {
        created_at: Some(created_at),
        updated_at: Some(now),
        ..person.clone()
    })
}

fn update_person(conn: &Connection, person: &Person) -> RepoResult<Person> {
    let id_text = person.id.to_string();
    let changed = conn.execute(
        "UPDATE people
         SET
            name = ?1,
            age = ?2,
            updated_at = MAX(?3, updated_at + 1)
         WHERE uuid = ?4;",
        params![person.name.as_str(), person.age, now_epoch_ms(), id_text],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound(person.id));
    }

    conn.execute(
        "DELETE FROM person_foods WHERE person_uuid = ?1;",
        [id_text.as_str()],
    )?;
    write_foods(conn, &id_text, &person.favorite_foods)?;

    load_person(conn, person.id)?.ok_or(RepoError::NotFound(person.id))
}

fn write_foods(conn: &Connection, person_uuid: &str, foods: &[String]) -> RepoResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO person_foods (person_uuid, position, food)
         VALUES (?1, ?2, ?3);",
    )?;
    for (position, food) in foods.iter().enumerate() {
        stmt.execute(params![person_uuid, position as i64, food.as_str()])?;
    }
    Ok(())
}

fn load_foods(conn: &Connection, person_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT food
         FROM person_foods
         WHERE person_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([person_uuid])?;
    let mut foods = Vec::new();
    while let Some(row) = rows.next()? {
        foods.push(row.get(0)?);
    }
    Ok(foods)
}

fn parse_person_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Person> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text)?;

    let person = Person {
        id,
        name: row.get("name")?,
        age: row.get("age")?,
        favorite_foods: load_foods(conn, &uuid_text)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    person.validate().map_err(|err| {
        RepoError::InvalidData(format!("person `{uuid_text}` failed validation: {err}"))
    })?;
    Ok(person)
}

fn parse_uuid(value: &str) -> RepoResult<PersonId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in people.uuid")))
}

fn person_exists(conn: &Connection, person_uuid: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM people WHERE uuid = ?1);",
        [person_uuid],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
