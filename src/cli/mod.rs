pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::app::build_store;
use crate::config::config;
use crate::database::Store;
use crate::observer::ObserverPipeline;
use crate::services::ResourceService;

#[derive(Parser)]
#[command(name = "potencialize")]
#[command(about = "Potencialize CLI - administration for the back office API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Schema inspection and migration")]
    Db {
        #[command(subcommand)]
        cmd: commands::db::DbCommands,
    },

    #[command(about = "Tenant provisioning")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::tenant::TenantCommands,
    },

    #[command(about = "User administration")]
    User {
        #[command(subcommand)]
        cmd: commands::user::UserCommands,
    },

    #[command(about = "System permission administration")]
    Permission {
        #[command(subcommand)]
        cmd: commands::permission::PermissionCommands,
    },

    #[command(about = "Token issuing")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Service over the configured store, with the same observers the server runs
pub(crate) fn service() -> ResourceService {
    let store: Arc<dyn Store> = build_store(config());
    ResourceService::new(store, Arc::new(ObserverPipeline::with_default_observers()))
}

/// Tenant argument, falling back to the configured default
pub(crate) fn tenant_or_default(tenant: Option<String>) -> String {
    tenant.unwrap_or_else(|| config().tenancy.default_tenant.clone())
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Db { cmd } => commands::db::handle(cmd, output_format).await,
        Commands::Tenant { cmd } => commands::tenant::handle(cmd, output_format).await,
        Commands::User { cmd } => commands::user::handle(cmd, output_format).await,
        Commands::Permission { cmd } => commands::permission::handle(cmd, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
    }
}
