//! `stockroom db`: one-shot database actions driven by flags.

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use stockroom::config::AgentConfig;
use stockroom::store::{self, export, inspect, query, seed};

#[derive(Debug, Args)]
pub struct DbArgs {
    /// Create the tables if they do not exist
    #[arg(long)]
    pub init: bool,
    /// Insert sample rows into empty tables
    #[arg(long)]
    pub add_sample_data: bool,
    /// Insert or update sample rows by natural key (email, sku)
    #[arg(long)]
    pub add_sample_data_upsert: bool,
    /// Run a SQL statement and print the result
    #[arg(long, value_name = "SQL")]
    pub query: Option<String>,
    /// Print every row of a table
    #[arg(long, value_name = "TABLE")]
    pub fetch_all: Option<String>,
    /// Print each table's columns, row count, and first row
    #[arg(long)]
    pub schema: bool,
    /// Search every column of every table for TEXT
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,
    /// Write a SQL dump of the database to PATH
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

impl DbArgs {
    fn is_empty(&self) -> bool {
        !self.init
            && !self.add_sample_data
            && !self.add_sample_data_upsert
            && self.query.is_none()
            && self.fetch_all.is_none()
            && !self.schema
            && self.search.is_none()
            && self.export.is_none()
    }
}

/// Run the requested actions in flag order: init, sample data, upsert, query,
/// fetch, schema, search, export.
pub fn run(config: &AgentConfig, args: &DbArgs) -> Result<()> {
    if args.is_empty() {
        bail!(
            "nothing to do; pass --init, --add-sample-data, --add-sample-data-upsert, \
             --query SQL, --fetch-all TABLE, --schema, --search TEXT, or --export PATH"
        );
    }

    let db_path = config.resolved_db_path();
    let mut conn = stockroom::db::open_database(&db_path)?;

    if args.init {
        stockroom::db::schema::init_schema(&conn)?;
        let version = stockroom::db::schema::get_schema_version(&conn)?;
        let tables = store::list_tables(&conn)?;
        println!(
            "Database ready at {} (schema v{version}; tables: {})",
            db_path.display(),
            tables.join(", ")
        );
    }

    if args.add_sample_data {
        println!("{}", seed::add_sample_data(&mut conn)?);
    }

    if args.add_sample_data_upsert {
        println!("{}", seed::upsert_sample_data(&mut conn)?);
    }

    if let Some(sql) = &args.query {
        println!("{}", query::run_query(&conn, sql)?);
    }

    if let Some(table) = &args.fetch_all {
        println!("{}", query::fetch_all(&conn, table)?);
    }

    if args.schema {
        for table in inspect::describe_schema(&conn)? {
            println!("{table}\n");
        }
    }

    if let Some(text) = &args.search {
        println!("{}", inspect::search(&conn, text)?);
    }

    if let Some(path) = &args.export {
        let stats = export::export_to_file(&conn, path)?;
        println!("Exported {stats} to {}", path.display());
    }

    Ok(())
}
