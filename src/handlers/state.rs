// handlers/state.rs - shared application state

use std::sync::Arc;

use axum::http::HeaderMap;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{token_from_headers, TokenService};
use crate::config::AppConfig;
use crate::services::mailer::mailer_from_config;
use crate::services::{AccountService, AssetStore, CloudinaryStore, Mailer, PgAccountStore};

/// Immutable state cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub accounts: Arc<AccountService>,
    pub assets: Option<Arc<dyn AssetStore>>,
}

impl AppState {
    /// Wires the default collaborators from configuration.
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        let mailer = mailer_from_config(&config.mail);
        let assets = CloudinaryStore::from_config(&config.storage)
            .map(|store| Arc::new(store) as Arc<dyn AssetStore>);
        if assets.is_none() {
            tracing::warn!("Cloudinary credentials not configured; asset deletion disabled");
        }
        Self::with_collaborators(pool, config, mailer, assets)
    }

    pub fn with_collaborators(
        pool: PgPool,
        config: AppConfig,
        mailer: Arc<dyn Mailer>,
        assets: Option<Arc<dyn AssetStore>>,
    ) -> Self {
        let tokens = TokenService::from_config(&config.security);
        let accounts = AccountService::new(
            Arc::new(PgAccountStore::new(pool.clone())),
            tokens.clone(),
            mailer,
            config.site.domain.clone(),
        );
        Self {
            pool,
            config: Arc::new(config),
            tokens,
            accounts: Arc::new(accounts),
            assets,
        }
    }

    /// The signed-in user's id, if the request carries a valid session token.
    pub fn session_user(&self, headers: &HeaderMap) -> Option<Uuid> {
        let token = token_from_headers(headers)?;
        let claims = self.tokens.verify(&token).ok()?;
        (!claims.is_one_time()).then_some(claims.user_id)
    }
}
