//! Chainable person query builder and field projection.
//!
//! # Responsibility
//! - Collect filter/sort/skip/limit options into one `PersonQuery`.
//! - Project fetched records down to a caller-selected field set.
//!
//! # Invariants
//! - All set filter fields are combined with AND.
//! - Insertion order is the final tie-breaker for every sort.
//! - `limit = Some(0)` behaves like no limit.
//! - The record id survives every projection.

use crate::model::person::{Person, PersonId};
use serde::Serialize;

/// Match criteria for person lookups.
///
/// An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    /// Exact name match.
    pub name: Option<String>,
    /// Matches when `favorite_foods` contains this value.
    pub favorite_food: Option<String>,
    /// Inclusive lower age bound. Records without an age never match.
    pub min_age: Option<i64>,
    /// Inclusive upper age bound. Records without an age never match.
    pub max_age: Option<i64>,
}

impl PersonFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn by_favorite_food(food: impl Into<String>) -> Self {
        Self {
            favorite_food: Some(food.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.favorite_food.is_none()
            && self.min_age.is_none()
            && self.max_age.is_none()
    }

    /// Evaluates the filter against an in-memory record.
    pub fn matches(&self, person: &Person) -> bool {
        if let Some(name) = self.name.as_deref() {
            if person.name != name {
                return false;
            }
        }
        if let Some(food) = self.favorite_food.as_deref() {
            if !person.favorite_foods.iter().any(|item| item == food) {
                return false;
            }
        }
        if let Some(min_age) = self.min_age {
            if !person.age.is_some_and(|age| age >= min_age) {
                return false;
            }
        }
        if let Some(max_age) = self.max_age {
            if !person.age.is_some_and(|age| age <= max_age) {
                return false;
            }
        }
        true
    }
}

/// Sortable person fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Age,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// One sort key. Keys earlier in `PersonQuery::sort` take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub order: SortOrder,
}

impl SortKey {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Ascending,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Descending,
        }
    }

    /// Parses `name`, `-name`, `age`, `-age`, `created`, `-created`.
    ///
    /// A leading `-` selects descending order.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let (order, field_name) = match trimmed.strip_prefix('-') {
            Some(rest) => (SortOrder::Descending, rest),
            None => (SortOrder::Ascending, trimmed),
        };
        let field = match field_name.to_ascii_lowercase().as_str() {
            "name" => SortField::Name,
            "age" => SortField::Age,
            "created" | "created_at" | "createdat" => SortField::CreatedAt,
            _ => return None,
        };
        Some(Self { field, order })
    }
}

/// Filter + sort + paging for list queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonQuery {
    pub filter: PersonFilter,
    pub sort: Vec<SortKey>,
    pub skip: u32,
    pub limit: Option<u32>,
}

impl PersonQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: PersonFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Effective row cap, with `Some(0)` normalized to unlimited.
    pub fn effective_limit(&self) -> Option<u32> {
        self.limit.filter(|limit| *limit > 0)
    }
}

/// Projectable person fields. The id is not listed: it is always kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonField {
    Name,
    Age,
    FavoriteFoods,
    CreatedAt,
    UpdatedAt,
}

impl PersonField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => Some(Self::Name),
            "age" => Some(Self::Age),
            "favoritefoods" | "favorite_foods" | "foods" => Some(Self::FavoriteFoods),
            "createdat" | "created_at" | "created" => Some(Self::CreatedAt),
            "updatedat" | "updated_at" | "updated" => Some(Self::UpdatedAt),
            _ => None,
        }
    }
}

/// Field selection applied to query results.
///
/// Include and exclude lists cannot be mixed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    All,
    Include(Vec<PersonField>),
    Exclude(Vec<PersonField>),
}

impl Projection {
    fn keeps(&self, field: PersonField) -> bool {
        match self {
            Self::All => true,
            Self::Include(fields) => fields.contains(&field),
            Self::Exclude(fields) => !fields.contains(&field),
        }
    }

    pub fn apply(&self, person: Person) -> ProjectedPerson {
        ProjectedPerson {
            id: person.id,
            name: self.keeps(PersonField::Name).then_some(person.name),
            age: if self.keeps(PersonField::Age) {
                person.age
            } else {
                None
            },
            favorite_foods: self
                .keeps(PersonField::FavoriteFoods)
                .then_some(person.favorite_foods),
            created_at: if self.keeps(PersonField::CreatedAt) {
                person.created_at
            } else {
                None
            },
            updated_at: if self.keeps(PersonField::UpdatedAt) {
                person.updated_at
            } else {
                None
            },
        }
    }
}

/// A person reduced by a `Projection`.
///
/// Omitted or unset fields are `None` and are left out of serialized output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedPerson {
    #[serde(rename = "_id")]
    pub id: PersonId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_foods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::{
        PersonField, PersonFilter, PersonQuery, Projection, SortField, SortKey, SortOrder,
    };
    use crate::model::person::Person;

    #[test]
    fn empty_filter_matches_everything() {
        let filter = PersonFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&Person::new("Yan")));
    }

    #[test]
    fn filter_combines_fields_with_and() {
        let person = Person::new("John Deo")
            .with_age(26)
            .with_favorite_foods(["rice & beans"]);
        let filter = PersonFilter {
            favorite_food: Some("rice & beans".to_string()),
            min_age: Some(20),
            max_age: Some(26),
            ..PersonFilter::default()
        };
        assert!(filter.matches(&person));

        let too_young = PersonFilter {
            min_age: Some(27),
            ..filter
        };
        assert!(!too_young.matches(&person));
    }

    #[test]
    fn age_bounds_never_match_missing_age() {
        let filter = PersonFilter {
            max_age: Some(100),
            ..PersonFilter::default()
        };
        assert!(!filter.matches(&Person::new("Nadia")));
    }

    #[test]
    fn sort_key_parses_direction_prefix() {
        assert_eq!(SortKey::parse("name"), Some(SortKey::asc(SortField::Name)));
        let key = SortKey::parse("-age").unwrap();
        assert_eq!(key.field, SortField::Age);
        assert_eq!(key.order, SortOrder::Descending);
        assert_eq!(SortKey::parse("height"), None);
    }

    #[test]
    fn zero_limit_means_unlimited() {
        assert_eq!(PersonQuery::new().limit(0).effective_limit(), None);
        assert_eq!(PersonQuery::new().limit(2).effective_limit(), Some(2));
    }

    #[test]
    fn exclude_projection_hides_only_listed_fields() {
        let person = Person::new("Jacky Ate")
            .with_age(21)
            .with_favorite_foods(["fish"]);
        let id = person.id;
        let projected = Projection::Exclude(vec![PersonField::Age]).apply(person);

        assert_eq!(projected.id, id);
        assert_eq!(projected.name.as_deref(), Some("Jacky Ate"));
        assert_eq!(projected.age, None);
        assert_eq!(projected.favorite_foods, Some(vec!["fish".to_string()]));
    }

    #[test]
    fn include_projection_keeps_id_and_listed_fields() {
        let person = Person::new("Yan").with_age(19);
        let projected = Projection::Include(vec![PersonField::Name]).apply(person);
        let json = serde_json::to_value(&projected).unwrap();

        assert!(json.get("_id").is_some());
        assert_eq!(json["name"], "Yan");
        assert!(json.get("age").is_none());
        assert!(json.get("favoriteFoods").is_none());
    }
}
