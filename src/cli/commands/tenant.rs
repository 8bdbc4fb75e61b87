use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::{DatabaseManager, PgStore, Store};

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "Create a tenant database and its schema")]
    Create {
        #[arg(help = "Tenant name")]
        name: String,
    },

    #[command(about = "Show the database a tenant maps to")]
    Info {
        #[arg(help = "Tenant name")]
        name: String,
    },
}

pub async fn handle(cmd: TenantCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TenantCommands::Create { name } => {
            let database = DatabaseManager::tenant_database(&name)?;
            PgStore::new().provision(&name).await?;
            tracing::info!("Provisioned tenant {} in {}", name, database);
            output_success(
                &output_format,
                &format!("Tenant '{}' ready", name),
                Some(json!({ "tenant": name, "database": database })),
            )
        }
        TenantCommands::Info { name } => {
            let database = DatabaseManager::tenant_database(&name)?;
            output_success(
                &output_format,
                &format!("Tenant '{}' uses database '{}'", name, database),
                Some(json!({ "tenant": name, "database": database })),
            )
        }
    }
}
