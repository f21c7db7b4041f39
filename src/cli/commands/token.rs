use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, AccessLevel, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token signed with the configured JWT secret")]
    Issue {
        #[arg(long, help = "User ID (random if omitted)")]
        user: Option<Uuid>,
        #[arg(long, help = "Email recorded in the token")]
        email: Option<String>,
        #[arg(long, default_value = "edit", help = "Access level: deny, read, edit, full, root")]
        access: AccessLevel,
        #[arg(long, help = "Hours until expiry (configured default if omitted)")]
        hours: Option<u64>,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue {
            user,
            email,
            access,
            hours,
        } => {
            let security = &config::config().security;
            if security.jwt_secret.is_empty() {
                anyhow::bail!("JWT_SECRET is not set");
            }

            let user_id = user.unwrap_or_else(Uuid::new_v4);
            let claims = Claims::new(user_id, email, access, hours.unwrap_or(security.jwt_expiry_hours));
            let token = generate_jwt(&claims, &security.jwt_secret)?;

            match output_format {
                OutputFormat::Text => println!("{}", token),
                OutputFormat::Json => output_success(
                    &output_format,
                    "Token issued",
                    Some(json!({
                        "token": token,
                        "userId": user_id,
                        "access": access,
                        "expiresAt": claims.exp,
                    })),
                )?,
            }
            Ok(())
        }
    }
}
