use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::*;
use crate::cli::{service, tenant_or_default, OutputFormat};
use crate::schema::registry::USERS;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user with a hashed password")]
    Create {
        #[arg(long, help = "Tenant name (defaults to DEFAULT_TENANT)")]
        tenant: Option<String>,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, help = "Role key, e.g. admin")]
        role: Option<String>,
    },
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = service();
    match cmd {
        UserCommands::Create { tenant, username, password, email, role } => {
            let tenant = tenant_or_default(tenant);
            let mut body = json!({ "username": username, "password": password });
            if let Some(email) = email {
                body["email"] = Value::String(email);
            }
            if let Some(role) = role {
                body["role"] = Value::String(role);
            }

            match service.create(&tenant, None, &USERS, body).await {
                Ok(user) => output_success(&output_format, &format!("User '{}' created", username), Some(user)),
                Err(e) => fail_with(&output_format, e),
            }
        }
    }
}
