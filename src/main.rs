use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;

use blogdeck::backend::StorageBackend;
use blogdeck::config::{StorageMode, StoreConfig};
use blogdeck::content::posts;
use blogdeck::db::models::Record;
use blogdeck::db::query::{Query, SortDirection};
use blogdeck::seed::seed_defaults;
use blogdeck::store::DocumentStore;

#[derive(Parser, Debug)]
#[command(name = "blogdeck", version)]
#[command(about = "Inspect and edit blog content in MongoDB or local JSON files", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./blogdeck.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured storage mode
    #[arg(long, global = true, value_enum)]
    mode: Option<ModeArg>,

    /// Override the directory holding the local JSON files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Local,
    Remote,
    Auto,
}

impl From<ModeArg> for StorageMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Local => StorageMode::Local,
            ModeArg::Remote => StorageMode::Remote,
            ModeArg::Auto => StorageMode::Auto,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List records of a collection
    List {
        collection: String,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Print one record
    Get { collection: String, id: String },
    /// Add a record from a JSON object (or @file) and print its id
    Add { collection: String, data: String },
    /// Merge a JSON object (or @file) into a record
    Update {
        collection: String,
        id: String,
        data: String,
    },
    /// Store a JSON object (or @file) under an explicit id
    Set {
        collection: String,
        id: String,
        data: String,
    },
    /// Delete a record
    Delete { collection: String, id: String },
    /// Print one page of a collection
    Page {
        collection: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        page_size: usize,
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Write the default menu and settings where missing
    Seed,
    /// Publish scheduled posts that are due
    PublishDue,
    /// Print which storage backend is in use
    Backend,
}

#[derive(Args, Debug, Default)]
struct QueryArgs {
    /// Equality filter (repeatable)
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    filters: Vec<String>,

    /// Membership filter, comma-separated values (repeatable)
    #[arg(long = "in", value_name = "FIELD=A,B")]
    in_filters: Vec<String>,

    /// Field to sort by
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Maximum number of records
    #[arg(long)]
    limit: Option<usize>,
}

impl QueryArgs {
    fn build(&self) -> Result<Query> {
        let mut query = Query::new();
        for filter in &self.filters {
            let (field, value) = split_pair(filter)?;
            query = query.where_eq(field, parse_value(value));
        }
        for filter in &self.in_filters {
            let (field, values) = split_pair(filter)?;
            query = query.where_in(field, values.split(',').map(parse_value));
        }
        if let Some(field) = &self.sort {
            let direction = if self.desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            query = query.order_by(field, direction);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        Ok(query)
    }
}

fn split_pair(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok((field, value)),
        _ => bail!("Expected FIELD=VALUE, got '{}'", arg),
    }
}

/// JSON scalars are taken as typed values, anything else as a string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_record(data: &str) -> Result<Record> {
    let text = match data.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path))?,
        None => data.to_string(),
    };
    match serde_json::from_str(&text).context("Invalid JSON")? {
        Value::Object(record) => Ok(record),
        other => bail!("Expected a JSON object, got: {}", other),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(store: &DocumentStore, command: Command) -> Result<()> {
    match command {
        Command::List { collection, query } => {
            print_json(&store.get_many(&collection, &query.build()?).await)
        }
        Command::Get { collection, id } => match store.get_one(&collection, &id).await {
            Some(record) => print_json(&record),
            None => bail!("No record '{}' in '{}'", id, collection),
        },
        Command::Add { collection, data } => {
            let id = store.add_one(&collection, parse_record(&data)?).await?;
            println!("{}", id);
            Ok(())
        }
        Command::Update {
            collection,
            id,
            data,
        } => Ok(store.update_one(&collection, &id, parse_record(&data)?).await?),
        Command::Set {
            collection,
            id,
            data,
        } => Ok(store.set_one(&collection, &id, parse_record(&data)?).await?),
        Command::Delete { collection, id } => {
            if !store.delete_one(&collection, &id).await? {
                tracing::warn!("No record '{}' in '{}'", id, collection);
            }
            Ok(())
        }
        Command::Page {
            collection,
            page,
            page_size,
            query,
        } => {
            let query = query.build()?;
            print_json(&store.get_page(&collection, page, page_size, &query).await?)
        }
        Command::Seed => {
            let seeded = seed_defaults(store).await?;
            print_json(&seeded)
        }
        Command::PublishDue => {
            let published = posts::publish_due(store, chrono::Utc::now()).await?;
            print_json(&published)
        }
        Command::Backend => {
            println!("{}", store.mode());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blogdeck=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config =
        StoreConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(mode) = cli.mode {
        config.storage.mode = mode.into();
    }
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    let store = DocumentStore::new(StorageBackend::connect(&config).await);
    run(&store, cli.command).await
}
