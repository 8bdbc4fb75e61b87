use clap::Subcommand;
use serde_json::json;

use crate::auth::issue_pair;
use crate::cli::utils::*;
use crate::cli::{service, tenant_or_default, OutputFormat};
use crate::database::store::Key;
use crate::schema::registry::USERS;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue an access/refresh pair for an existing user without a password")]
    Issue {
        #[arg(long, help = "Tenant name (defaults to DEFAULT_TENANT)")]
        tenant: Option<String>,
        #[arg(long, help = "Numeric user id")]
        user_id: i64,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { tenant, user_id } => {
            let tenant = tenant_or_default(tenant);
            let user = match service().retrieve(&tenant, &USERS, &Key::Int(user_id)).await {
                Ok(user) => user,
                Err(e) => return fail_with(&output_format, e),
            };
            let username = user.get("username").and_then(|v| v.as_str()).unwrap_or_default();

            let pair = issue_pair(user_id, username, &tenant)?;
            output_success(
                &output_format,
                &format!("Issued tokens for '{}'", username),
                Some(json!({ "access": pair.access, "refresh": pair.refresh })),
            )
        }
    }
}
