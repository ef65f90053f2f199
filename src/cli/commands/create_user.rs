use anyhow::{bail, Context};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::user::CreateUser;
use crate::database::models::{User, UserStatus};
use crate::database::DatabaseManager;
use crate::services::{AccountStore, PgAccountStore, ResourceService};

pub struct NewAdmin {
    pub email: String,
    pub username: String,
    pub role: String,
    pub password: String,
}

/// Inserts an `active` user directly, bypassing the invite flow.
pub async fn handle(config: AppConfig, input: NewAdmin, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("connecting to database")?;

    if PgAccountStore::new(pool.clone())
        .find_by_email(&input.email)
        .await?
        .is_some()
    {
        bail!("a user with email {} already exists", input.email);
    }

    let payload = CreateUser {
        email: Some(input.email),
        username: Some(input.username),
        role: Some(input.role),
        status: Some(UserStatus::Active.as_str().to_string()),
        password: Some(input.password),
    };
    let user: User = ResourceService::<User>::new(pool)
        .create(payload, None)
        .await
        .context("creating user")?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
        OutputFormat::Text => println!("Created {} user {} <{}> ({})", user.role, user.username, user.email, user.id),
    }
    Ok(())
}
