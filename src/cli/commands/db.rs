use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::{tenant_or_default, OutputFormat};
use crate::database::{PgStore, Store};
use crate::schema::ddl;

#[derive(Subcommand)]
pub enum DbCommands {
    #[command(about = "Print the CREATE TABLE statements for a tenant database")]
    Ddl,

    #[command(about = "Create missing tables in a tenant database")]
    Migrate {
        #[arg(long, help = "Tenant name (defaults to DEFAULT_TENANT)")]
        tenant: Option<String>,
    },
}

pub async fn handle(cmd: DbCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DbCommands::Ddl => {
            let statements = ddl::statements();
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "statements": statements }))?),
                OutputFormat::Text => {
                    for statement in statements {
                        println!("{};\n", statement);
                    }
                }
            }
            Ok(())
        }
        DbCommands::Migrate { tenant } => {
            let tenant = tenant_or_default(tenant);
            PgStore::new().provision(&tenant).await?;
            output_success(
                &output_format,
                &format!("Schema applied to tenant '{}'", tenant),
                Some(json!({ "tenant": tenant, "tables": ddl::statements().len() })),
            )
        }
    }
}
