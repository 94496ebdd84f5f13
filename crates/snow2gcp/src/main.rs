//! snow2gcp - export Snowflake views to Google Cloud Storage and BigQuery

mod commands;
mod error;
mod progress;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use snow2gcp_core::{ConnectionConfig, Settings, SnowflakeSession};

use commands::export::{ExportArgs, handle_export};
use commands::list::{
    ListSchemasArgs, ListViewsArgs, handle_list_databases, handle_list_schemas,
    handle_list_views, handle_list_warehouses,
};
use error::CliError;

#[derive(Parser)]
#[command(
    name = "snow2gcp",
    version,
    about = "Export Snowflake views to Google Cloud Storage as Parquet, optionally loading them into BigQuery"
)]
struct Cli {
    /// Snowflake account identifier (or SNOWFLAKE_ACCOUNT)
    #[arg(long, global = true)]
    account: Option<String>,

    /// Snowflake user name (or SNOWFLAKE_USER)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Snowflake password (or SNOWFLAKE_PASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Warehouse to activate at login (or SNOWFLAKE_WAREHOUSE)
    #[arg(long, global = true)]
    warehouse: Option<String>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List warehouses, databases, schemas or views
    List {
        #[command(subcommand)]
        target: ListTarget,
    },
    /// Export views to a GCS bucket, optionally loading them into BigQuery
    Export {
        /// Source database
        #[arg(long)]
        database: String,

        /// Source schema
        #[arg(long)]
        schema: String,

        /// View to export (repeat for several)
        #[arg(long = "view", value_name = "VIEW", conflicts_with = "all_views")]
        views: Vec<String>,

        /// Export every view in the schema
        #[arg(long)]
        all_views: bool,

        /// Destination bucket, with or without a gs:// prefix (or GCS_BUCKET)
        #[arg(long)]
        bucket: Option<String>,

        /// Google Cloud project for BigQuery (or GCP_PROJECT)
        #[arg(long)]
        project: Option<String>,

        /// Load the exported views into BigQuery afterwards
        #[arg(long)]
        bigquery: bool,
    },
}

#[derive(Subcommand)]
enum ListTarget {
    /// List warehouses visible to the session
    Warehouses,
    /// List databases visible to the session
    Databases,
    /// List schemas in a database
    Schemas {
        /// Database to list schemas from
        #[arg(long)]
        database: String,
    },
    /// List views in a schema
    Views {
        /// Database containing the schema
        #[arg(long)]
        database: String,

        /// Schema to list views from
        #[arg(long)]
        schema: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let settings = Settings::from_env();
    let config = connection_config(&cli, &settings)?;

    let session = SnowflakeSession::connect(config)
        .await
        .map_err(CliError::from)?;

    let result = run_command(&session, &settings, &cli.command).await;
    session.close().await;

    Ok(result?)
}

async fn run_command(
    session: &SnowflakeSession,
    settings: &Settings,
    command: &Command,
) -> Result<(), CliError> {
    match command {
        Command::List { target } => match target {
            ListTarget::Warehouses => handle_list_warehouses(session).await,
            ListTarget::Databases => handle_list_databases(session).await,
            ListTarget::Schemas { database } => {
                let args = ListSchemasArgs {
                    database: database.clone(),
                };
                handle_list_schemas(session, &args).await
            }
            ListTarget::Views { database, schema } => {
                let args = ListViewsArgs {
                    database: database.clone(),
                    schema: schema.clone(),
                };
                handle_list_views(session, &args).await
            }
        },
        Command::Export {
            database,
            schema,
            views,
            all_views,
            bucket,
            project,
            bigquery,
        } => {
            let bucket = bucket
                .clone()
                .or_else(|| settings.gcs_bucket.clone())
                .ok_or(CliError::MissingArgument {
                    name: "destination bucket",
                    flag: "--bucket",
                    env: "GCS_BUCKET",
                })?;
            let args = ExportArgs {
                database: database.clone(),
                schema: schema.clone(),
                views: views.clone(),
                all_views: *all_views,
                bucket,
                project: project.clone(),
                bigquery: *bigquery,
            };
            handle_export(session, settings, &args).await
        }
    }
}

/// Connection settings: flags win, the environment fills the gaps.
fn connection_config(cli: &Cli, settings: &Settings) -> Result<ConnectionConfig, CliError> {
    let account = cli
        .account
        .clone()
        .or_else(|| settings.snowflake_account.clone())
        .ok_or(CliError::MissingArgument {
            name: "Snowflake account",
            flag: "--account",
            env: "SNOWFLAKE_ACCOUNT",
        })?;
    let user = cli
        .user
        .clone()
        .or_else(|| settings.snowflake_user.clone())
        .ok_or(CliError::MissingArgument {
            name: "Snowflake user",
            flag: "--user",
            env: "SNOWFLAKE_USER",
        })?;
    let password = cli
        .password
        .clone()
        .or_else(|| settings.snowflake_password.clone())
        .ok_or(CliError::MissingArgument {
            name: "Snowflake password",
            flag: "--password",
            env: "SNOWFLAKE_PASSWORD",
        })?;

    let mut config = ConnectionConfig::new(account, user, password);
    if let Some(warehouse) = cli
        .warehouse
        .clone()
        .or_else(|| settings.snowflake_warehouse.clone())
    {
        config = config.with_warehouse(warehouse);
    }
    Ok(config)
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("snow2gcp=debug,snow2gcp_core=debug,warn")
    } else {
        EnvFilter::new("snow2gcp=info,snow2gcp_core=warn,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
