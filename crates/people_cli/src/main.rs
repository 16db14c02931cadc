//! `people` command-line front end.
//!
//! # Responsibility
//! - Map sub-commands onto `PersonService` operations.
//! - Print results as JSON on stdout and failures on stderr.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use people_core::db::open_db_from_uri;
use people_core::{
    init_from_config, AppConfig, NewPerson, Person, PersonField, PersonFilter, PersonId,
    PersonQuery, PersonService, Projection, SortKey, SqlitePersonRepository, DEFAULT_AGE_TO_SET,
    DEFAULT_FOOD_TO_ADD,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "people", version, about = "Manage the people collection")]
struct Cli {
    /// Store connection string. Overrides PEOPLE_DB_URI / DATABASE_URL.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Absolute directory for rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create and save one person.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: Option<i64>,
        /// Favorite food; repeat to add several in order.
        #[arg(long = "food")]
        foods: Vec<String>,
    },
    /// Create people from a JSON array file.
    CreateMany { file: PathBuf },
    /// List every person.
    List,
    FindByName { name: String },
    /// Find the first person who lists FOOD as a favorite.
    FindByFood { food: String },
    Get { id: PersonId },
    /// Append a favorite food via read-modify-write.
    AddFood {
        id: PersonId,
        #[arg(long, default_value = DEFAULT_FOOD_TO_ADD)]
        food: String,
    },
    /// Set the age of the first person with NAME.
    SetAge {
        name: String,
        #[arg(long, default_value_t = DEFAULT_AGE_TO_SET)]
        age: i64,
    },
    Remove { id: PersonId },
    /// Remove every person matching the given criteria.
    RemoveMany(FilterArgs),
    /// Filtered, sorted, limited and projected query.
    Query(QueryArgs),
    /// Count people matching the given criteria.
    Count(FilterArgs),
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    food: Option<String>,
    #[arg(long)]
    min_age: Option<i64>,
    #[arg(long)]
    max_age: Option<i64>,
}

impl From<FilterArgs> for PersonFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            name: args.name,
            favorite_food: args.food,
            min_age: args.min_age,
            max_age: args.max_age,
        }
    }
}

#[derive(Args)]
struct QueryArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Sort key (`name`, `-name`, `age`, `-age`, `created`, `-created`).
    #[arg(long = "sort", allow_hyphen_values = true)]
    sort: Vec<String>,
    #[arg(long, default_value_t = 0)]
    skip: u32,
    #[arg(long)]
    limit: Option<u32>,
    /// Field to hide from results.
    #[arg(long = "hide", conflicts_with = "only")]
    hide: Vec<String>,
    /// Field to keep in results; all others are hidden.
    #[arg(long = "only")]
    only: Vec<String>,
}

impl QueryArgs {
    fn into_parts(self) -> Result<(PersonQuery, Projection)> {
        let mut query = PersonQuery::new().filter(self.filter.into()).skip(self.skip);
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        for raw in &self.sort {
            let key = SortKey::parse(raw).ok_or_else(|| anyhow!("unknown sort key `{raw}`"))?;
            query = query.sort_by(key);
        }

        let projection = if !self.only.is_empty() {
            Projection::Include(parse_fields(&self.only)?)
        } else if !self.hide.is_empty() {
            Projection::Exclude(parse_fields(&self.hide)?)
        } else {
            Projection::All
        };

        Ok((query, projection))
    }
}

fn parse_fields(raw: &[String]) -> Result<Vec<PersonField>> {
    raw.iter()
        .map(|value| PersonField::parse(value).ok_or_else(|| anyhow!("unknown field `{value}`")))
        .collect()
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db {
        config.database_uri = db;
    }
    if let Some(log_dir) = cli.log_dir {
        config.log_dir = Some(log_dir);
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }
    init_from_config(&config).context("failed to initialize logging")?;

    let conn = open_db_from_uri(&config.database_uri)
        .with_context(|| format!("failed to open store `{}`", config.database_uri))?;
    let service = PersonService::new(SqlitePersonRepository::try_new(&conn)?);

    match cli.command {
        Command::Create { name, age, foods } => {
            let mut person = Person::new(name).with_favorite_foods(foods);
            person.age = age;
            print_json(&service.create_and_save_person(person)?)
        }
        Command::CreateMany { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            let people: Vec<NewPerson> = serde_json::from_str(&raw)
                .with_context(|| format!("`{}` is not a JSON array of people", file.display()))?;
            print_json(&service.create_many_people(people)?)
        }
        Command::List => print_json(&service.find_all_people()?),
        Command::FindByName { name } => print_json(&service.find_people_by_name(&name)?),
        Command::FindByFood { food } => print_json(&service.find_one_by_food(&food)?),
        Command::Get { id } => print_json(&service.find_person_by_id(id)?),
        Command::AddFood { id, food } => print_json(&service.add_favorite_food(id, &food)?),
        Command::SetAge { name, age } => print_json(&service.set_age_by_name(&name, age)?),
        Command::Remove { id } => print_json(&service.remove_by_id(id)?),
        Command::RemoveMany(filter) => {
            let filter = PersonFilter::from(filter);
            if filter.is_empty() {
                bail!("remove-many needs at least one criterion");
            }
            let outcome = service.remove_many_people(&filter)?;
            print_json(&serde_json::json!({ "deletedCount": outcome.deleted_count }))
        }
        Command::Query(args) => {
            let (query, projection) = args.into_parts()?;
            print_json(&service.query_chain(&query, &projection)?)
        }
        Command::Count(filter) => {
            let count = service.count_people(&filter.into())?;
            print_json(&serde_json::json!({ "count": count }))
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
