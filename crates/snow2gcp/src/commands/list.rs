//! CLI commands for warehouse metadata listings

use snow2gcp_core::SnowflakeSession;

use crate::error::CliError;

/// Arguments for the `list schemas` command
pub struct ListSchemasArgs {
    /// Database to list schemas from
    pub database: String,
}

/// Arguments for the `list views` command
pub struct ListViewsArgs {
    /// Database containing the schema
    pub database: String,
    /// Schema to list views from
    pub schema: String,
}

/// Handle the `list warehouses` command
pub async fn handle_list_warehouses(session: &SnowflakeSession) -> Result<(), CliError> {
    print_names(&session.list_warehouses().await?);
    Ok(())
}

/// Handle the `list databases` command
pub async fn handle_list_databases(session: &SnowflakeSession) -> Result<(), CliError> {
    print_names(&session.list_databases().await?);
    Ok(())
}

/// Handle the `list schemas` command
pub async fn handle_list_schemas(
    session: &SnowflakeSession,
    args: &ListSchemasArgs,
) -> Result<(), CliError> {
    print_names(&session.list_schemas(&args.database).await?);
    Ok(())
}

/// Handle the `list views` command
pub async fn handle_list_views(
    session: &SnowflakeSession,
    args: &ListViewsArgs,
) -> Result<(), CliError> {
    print_names(&session.list_views(&args.database, &args.schema).await?);
    Ok(())
}

// One name per line, so output stays pipeable.
fn print_names(names: &[String]) {
    if names.is_empty() {
        eprintln!("(none)");
        return;
    }
    for name in names {
        println!("{}", name);
    }
}
