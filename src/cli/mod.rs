pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "cms-admin")]
#[command(about = "CMS admin API server and maintenance commands")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    /// Defaults to `serve` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Apply pending migrations before accepting traffic")]
        migrate: bool,
    },

    #[command(about = "Apply pending database migrations and exit")]
    Migrate,

    #[command(about = "Create an active user with a password (bootstrap the first admin)")]
    CreateUser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "admin")]
        role: String,
        #[arg(long, help = "At least 8 characters")]
        password: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
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

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = AppConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve { migrate: false }) {
        Commands::Serve { migrate } => commands::serve::handle(config, migrate).await,
        Commands::Migrate => commands::migrate::handle(config).await,
        Commands::CreateUser {
            email,
            username,
            role,
            password,
        } => {
            let input = commands::create_user::NewAdmin {
                email,
                username,
                role,
                password,
            };
            commands::create_user::handle(config, input, output_format).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["cms-admin"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn create_user_arguments() {
        let cli = Cli::try_parse_from([
            "cms-admin",
            "--json",
            "create-user",
            "--email",
            "root@example.com",
            "--username",
            "root",
            "--password",
            "long enough",
        ])
        .unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        match cli.command {
            Some(Commands::CreateUser { role, .. }) => assert_eq!(role, "admin"),
            _ => panic!("expected create-user"),
        }
    }
}
