//! ERP CLI - Operator command-line tool
//!
//! Usage:
//!   erp hash-password <password>
//!   erp check-password <password>
//!   erp issue-token --username <name> --role <role> [--permissions a:b,c:d]
//!   erp verify-token <token>
//!   erp permissions
//!
//! Token and hashing settings come from the same environment variables as
//! the server (`JWT_SECRET`, `JWT_ISSUER`, `JWT_EXPIRES_IN`, ...).

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use erp_api::auth::password::hash_password_async;
use erp_api::auth::{
    decode_claims, generate_token, validate_password_strength, Identity, JwtConfig,
    PasswordConfig,
};
use erp_core::{AppConfig, PermissionSet, RoleName, PERMISSION_CATALOG};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "erp")]
#[command(about = "Operator tool for the ERP RBAC service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hash a password with the configured Argon2 parameters
    HashPassword {
        /// Plaintext password
        password: String,
        /// Skip the strength rules
        #[arg(long)]
        allow_weak: bool,
    },
    /// Check a password against the strength rules
    CheckPassword {
        /// Plaintext password
        password: String,
    },
    /// Sign a token for an arbitrary identity
    IssueToken {
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "user")]
        role: String,
        /// Comma-separated permission strings
        #[arg(long, value_delimiter = ',')]
        permissions: Vec<String>,
        /// User id (random when omitted)
        #[arg(long)]
        id: Option<Uuid>,
    },
    /// Verify a token and print its claims
    VerifyToken {
        token: String,
    },
    /// Print the permission catalog
    Permissions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("loading configuration")?;

    match cli.command {
        Commands::HashPassword {
            password,
            allow_weak,
        } => {
            if !allow_weak {
                validate_password_strength(&password)?;
            }
            let hash = hash_password_async(password, PasswordConfig::from(&config.auth)).await?;
            println!("{hash}");
        }
        Commands::CheckPassword { password } => match validate_password_strength(&password) {
            Ok(()) => println!("Password meets the strength rules"),
            Err(weak) => bail!("{weak}"),
        },
        Commands::IssueToken {
            username,
            role,
            permissions,
            id,
        } => {
            let identity = Identity {
                id: id.unwrap_or_else(Uuid::new_v4),
                username,
                role: RoleName::parse(&role)?,
                permissions: PermissionSet::parse(&permissions)?,
            };
            let token = generate_token(&JwtConfig::from(&config.auth), &identity)?;
            tracing::info!(user_id = %identity.id, role = %identity.role, "token issued");
            println!("{token}");
        }
        Commands::VerifyToken { token } => {
            let jwt = JwtConfig::from(&config.auth);
            let claims = decode_claims(&jwt, &token).context("token rejected")?;
            let identity = Identity::try_from(claims.clone()).context("token payload rejected")?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
            if identity.is_admin() {
                println!("(admin role: every permission check passes)");
            }
        }
        Commands::Permissions => {
            for permission in PERMISSION_CATALOG {
                println!("{permission}");
            }
        }
    }

    Ok(())
}
