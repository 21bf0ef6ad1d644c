//! Command-line interface
//!
//! The binary either serves HTTP or runs a user-management command
//! against the configured database. User commands go through the same
//! `UserService` as the API, so the admin bootstrap and the HTTP
//! endpoints enforce identical rules.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
use crate::db::{self, migrations::run_migrations};
use crate::models::UserRole;
use crate::services::{RateLimiter, UserService};

/// WebGarden - marketing and blog site backend
#[derive(Parser)]
#[command(name = "webgarden")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Create an admin user
    CreateAdmin {
        username: String,
        email: String,
        /// Password for the new account
        #[arg(long)]
        password: String,
    },

    /// Reset a user's password and invalidate their sessions
    ResetPassword {
        username: String,
        #[arg(long)]
        password: String,
    },

    /// List all users
    #[command(alias = "ls")]
    ListUsers,

    /// Delete a user
    DeleteUser { username: String },

    /// Grant a user the admin role
    PromoteUser { username: String },

    /// Revoke a user's admin role
    DemoteUser { username: String },
}

/// Build a `UserService` against the configured database.
async fn user_service(config: &Config) -> Result<UserService> {
    let pool = db::create_pool(&config.database).await?;
    run_migrations(&pool).await?;
    Ok(UserService::new(
        SqlxUserRepository::boxed(pool.clone()),
        SqlxSessionRepository::boxed(pool),
        Arc::new(RateLimiter::new()),
    ))
}

/// Run a user-management subcommand. `Serve` is handled by the caller.
pub async fn run_command(config: &Config, command: &Commands) -> Result<()> {
    match command {
        Commands::Serve => unreachable!("serve is handled by main"),

        Commands::CreateAdmin {
            username,
            email,
            password,
        } => {
            let service = user_service(config).await?;
            let user = service
                .create_user(username, email, password, UserRole::Admin)
                .await?;
            println!("Created admin user '{}' (id {})", user.username, user.id);
        }

        Commands::ResetPassword { username, password } => {
            let service = user_service(config).await?;
            service.reset_password(username, password).await?;
            println!("Password reset for '{}'", username);
        }

        Commands::ListUsers => {
            let service = user_service(config).await?;
            let users = service.list_users().await?;
            if users.is_empty() {
                println!("No users");
                return Ok(());
            }
            println!("{:<6} {:<24} {:<32} {:<8} last login", "id", "username", "email", "role");
            for user in users {
                let last_login = user
                    .last_login
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{:<6} {:<24} {:<32} {:<8} {}",
                    user.id, user.username, user.email, user.role, last_login
                );
            }
        }

        Commands::DeleteUser { username } => {
            let service = user_service(config).await?;
            service.delete_user(username).await?;
            println!("Deleted user '{}'", username);
        }

        Commands::PromoteUser { username } => {
            let service = user_service(config).await?;
            service.set_role(username, UserRole::Admin).await?;
            println!("'{}' is now an admin", username);
        }

        Commands::DemoteUser { username } => {
            let service = user_service(config).await?;
            service.set_role(username, UserRole::Editor).await?;
            println!("'{}' is now an editor", username);
        }
    }
    Ok(())
}
