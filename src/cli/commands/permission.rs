use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::{service, tenant_or_default, OutputFormat};
use crate::schema::registry::PERMISSIONS;

/// System permissions are read-only over HTTP; this is how they get seeded
#[derive(Subcommand)]
pub enum PermissionCommands {
    #[command(about = "Register a system permission")]
    Create {
        #[arg(long, help = "Tenant name (defaults to DEFAULT_TENANT)")]
        tenant: Option<String>,
        #[arg(long, help = "Unique key, e.g. clients.view")]
        key: String,
        #[arg(long)]
        label: String,
        #[arg(long)]
        module: String,
    },
}

pub async fn handle(cmd: PermissionCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PermissionCommands::Create { tenant, key, label, module } => {
            let tenant = tenant_or_default(tenant);
            let body = json!({ "key": key, "label": label, "module": module });

            match service().create(&tenant, None, &PERMISSIONS, body).await {
                Ok(permission) => output_success(&output_format, &format!("Permission '{}' created", key), Some(permission)),
                Err(e) => fail_with(&output_format, e),
            }
        }
    }
}
