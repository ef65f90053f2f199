use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{hash_password, hash_token, verify_password, PasswordError, TokenError, TokenService};
use crate::database::models::validate;
use crate::database::models::{User, UserStatus, ValidationError};
use crate::database::DatabaseError;
use crate::services::account_store::{AccountStore, NewUser};
use crate::services::mailer::{invite_email, MailError, Mailer};

/// Role given to users created by an invite that names none.
pub const DEFAULT_INVITE_ROLE: &str = "contributor";

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email, wrong password and inactive account look the same.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(PasswordError),

    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error("Failed to send invitation email: {0}")]
    Mail(#[from] MailError),
}

#[derive(Debug, Default, Deserialize)]
pub struct SignUpRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InviteRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct SignedIn {
    pub user: User,
    pub token: String,
}

/// What step 1 of an invite changed, so a failed attempt can be undone.
#[derive(Debug, Clone, Copy)]
enum InviteTarget {
    Created,
    Existing { previous: UserStatus },
}

/// Sign-up, sign-in and the invite / set-password workflow.
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    site_domain: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        tokens: TokenService,
        mailer: Arc<dyn Mailer>,
        site_domain: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tokens,
            mailer,
            site_domain: site_domain.into(),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Registers a `pending` user. Duplicate emails are a validation error.
    pub async fn sign_up(&self, input: SignUpRequest) -> Result<User, AuthError> {
        let email = validate::required_email("email", input.email)?;
        let username = validate::required_text("username", input.username)?;
        let role = validate::required_text("role", input.role)?;

        if self.store.find_by_email(&email).await?.is_some() {
            return Err(ValidationError::invalid("email", "A user with this email already exists").into());
        }

        let user = self.store.create_user(NewUser { email, username, role }).await?;
        tracing::info!("User {} signed up", user.id);
        Ok(user)
    }

    pub async fn sign_in(&self, input: SignInRequest) -> Result<SignedIn, AuthError> {
        let (Some(email), Some(password)) = (validate::optional_text(input.email), input.password) else {
            return Err(AuthError::InvalidCredentials);
        };

        let account = match self.store.find_by_email(&email.to_lowercase()).await? {
            Some(account) => account,
            None => {
                tracing::info!("Sign-in rejected: unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if account.user.status != UserStatus::Active {
            tracing::info!("Sign-in rejected for {}: status {}", account.user.id, account.user.status.as_str());
            return Err(AuthError::InvalidCredentials);
        }

        let matches = account
            .password_hash
            .as_deref()
            .map(|hash| verify_password(&password, hash))
            .unwrap_or(false);
        if !matches {
            tracing::info!("Sign-in rejected for {}: bad password", account.user.id);
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue_session_token(account.user.id)?;
        tracing::info!("User {} signed in", account.user.id);
        Ok(SignedIn {
            user: account.user,
            token,
        })
    }

    /// Marks the user pending (creating it when a username is given), stores
    /// a one-time token digest and emails the raw token. Any failure after the
    /// user step is compensated before the error is returned.
    pub async fn send_invite(&self, input: InviteRequest) -> Result<User, AuthError> {
        let email = validate::required_email("email", input.email)?;

        let (user, target) = match self.store.find_by_email(&email).await? {
            Some(account) => {
                let previous = account.user.status;
                self.store.set_status(account.user.id, UserStatus::Pending).await?;
                let mut user = account.user;
                user.status = UserStatus::Pending;
                (user, InviteTarget::Existing { previous })
            }
            None => {
                let username = validate::optional_text(input.username).ok_or(AuthError::UserNotFound)?;
                let role = validate::optional_text(input.role)
                    .unwrap_or_else(|| DEFAULT_INVITE_ROLE.to_string());
                let user = self.store.create_user(NewUser { email, username, role }).await?;
                (user, InviteTarget::Created)
            }
        };

        match self.issue_and_send(&user).await {
            Ok(()) => {
                tracing::info!("Invite sent to user {}", user.id);
                Ok(user)
            }
            Err(e) => {
                tracing::warn!("Invite for user {} failed, rolling back: {}", user.id, e);
                self.roll_back_invite(user.id, target).await;
                Err(e)
            }
        }
    }

    async fn issue_and_send(&self, user: &User) -> Result<(), AuthError> {
        let token = self.tokens.issue_one_time_token(user.id)?;
        let expires_at = Utc::now() + self.tokens.one_time_ttl();
        self.store.store_token(user.id, &hash_token(&token), expires_at).await?;

        self.mailer
            .send(invite_email(&user.email, &self.site_domain, &token, self.tokens.one_time_ttl()))
            .await?;
        Ok(())
    }

    /// Best effort. Failures are logged and do not replace the original error.
    async fn roll_back_invite(&self, user_id: Uuid, target: InviteTarget) {
        if let Err(e) = self.store.delete_tokens(user_id).await {
            tracing::error!("Rollback: failed to delete tokens for user {}: {}", user_id, e);
        }

        match target {
            InviteTarget::Created => match self.store.delete_user(user_id).await {
                Ok(_) => tracing::info!("Rollback: removed user {} created by failed invite", user_id),
                Err(e) => tracing::error!("Rollback: failed to delete user {}: {}", user_id, e),
            },
            InviteTarget::Existing { previous } => {
                if let Err(e) = self.store.set_status(user_id, previous).await {
                    tracing::error!("Rollback: failed to restore status of user {}: {}", user_id, e);
                }
            }
        }
    }

    /// Checks a one-time token without consuming it.
    pub async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.tokens.verify(token).map_err(|_| AuthError::InvalidToken)?;

        let stored = self
            .store
            .find_token(&hash_token(token))
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if stored.user_id != claims.user_id || stored.expires_at <= Utc::now() {
            return Err(AuthError::InvalidToken);
        }

        let account = self
            .store
            .find_by_id(claims.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        Ok(account.user)
    }

    /// Completes an invite: the token is checked, the password stored hashed,
    /// the user activated and all of the user's tokens removed.
    pub async fn set_password(&self, input: SetPasswordRequest) -> Result<User, AuthError> {
        let token = validate::optional_text(input.token).ok_or(AuthError::InvalidToken)?;
        let password = input.password.ok_or_else(|| ValidationError::required("password"))?;

        let user = self.validate_token(&token).await?;

        let password_hash = hash_password(&password).map_err(|e| match e {
            PasswordError::TooShort => AuthError::Validation(ValidationError::invalid("password", e.to_string())),
            PasswordError::Hashing(_) => AuthError::Password(e),
        })?;

        let user = self.store.activate(user.id, &password_hash).await?;
        tracing::info!("User {} activated", user.id);
        Ok(user)
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<bool, AuthError> {
        Ok(self.store.delete_user(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Account;
    use crate::services::account_store::StoredToken;
    use crate::services::mailer::OutgoingEmail;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        users: Mutex<HashMap<Uuid, Account>>,
        tokens: Mutex<Vec<StoredToken>>,
    }

    impl MemoryStore {
        fn user_count(&self) -> usize {
            self.users.lock().unwrap().len()
        }

        fn token_count(&self) -> usize {
            self.tokens.lock().unwrap().len()
        }

        fn insert_active(&self, email: &str, password: &str) -> Uuid {
            let now = Utc::now();
            let id = Uuid::new_v4();
            self.users.lock().unwrap().insert(
                id,
                Account {
                    user: User {
                        id,
                        email: email.to_string(),
                        username: "existing".to_string(),
                        role: "admin".to_string(),
                        status: UserStatus::Active,
                        created_at: now,
                        updated_at: now,
                    },
                    password_hash: Some(hash_password(password).unwrap()),
                },
            );
            id
        }

        fn status_of(&self, id: Uuid) -> Option<UserStatus> {
            self.users.lock().unwrap().get(&id).map(|a| a.user.status)
        }

        fn expire_tokens(&self) {
            for t in self.tokens.lock().unwrap().iter_mut() {
                t.expires_at = Utc::now() - Duration::minutes(1);
            }
        }
    }

    #[async_trait]
    impl AccountStore for MemoryStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|a| a.user.email.eq_ignore_ascii_case(email))
                .cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        async fn create_user(&self, user: NewUser) -> Result<User, DatabaseError> {
            let now = Utc::now();
            let created = User {
                id: Uuid::new_v4(),
                email: user.email,
                username: user.username,
                role: user.role,
                status: UserStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            self.users.lock().unwrap().insert(
                created.id,
                Account {
                    user: created.clone(),
                    password_hash: None,
                },
            );
            Ok(created)
        }

        async fn set_status(&self, id: Uuid, status: UserStatus) -> Result<(), DatabaseError> {
            let mut users = self.users.lock().unwrap();
            let account = users
                .get_mut(&id)
                .ok_or_else(|| DatabaseError::NotFound("User not found".into()))?;
            account.user.status = status;
            Ok(())
        }

        async fn activate(&self, id: Uuid, password_hash: &str) -> Result<User, DatabaseError> {
            let user = {
                let mut users = self.users.lock().unwrap();
                let account = users
                    .get_mut(&id)
                    .ok_or_else(|| DatabaseError::NotFound("User not found".into()))?;
                account.user.status = UserStatus::Active;
                account.password_hash = Some(password_hash.to_string());
                account.user.clone()
            };
            self.tokens.lock().unwrap().retain(|t| t.user_id != id);
            Ok(user)
        }

        async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError> {
            self.tokens.lock().unwrap().retain(|t| t.user_id != id);
            Ok(self.users.lock().unwrap().remove(&id).is_some())
        }

        async fn store_token(
            &self,
            user_id: Uuid,
            token_hash: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<(), DatabaseError> {
            self.tokens.lock().unwrap().push(StoredToken {
                user_id,
                token_hash: token_hash.to_string(),
                expires_at,
            });
            Ok(())
        }

        async fn find_token(&self, token_hash: &str) -> Result<Option<StoredToken>, DatabaseError> {
            Ok(self
                .tokens
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.token_hash == token_hash)
                .cloned())
        }

        async fn delete_tokens(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
            let mut tokens = self.tokens.lock().unwrap();
            let before = tokens.len();
            tokens.retain(|t| t.user_id != user_id);
            Ok((before - tokens.len()) as u64)
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    impl RecordingMailer {
        fn last_token(&self) -> String {
            let sent = self.sent.lock().unwrap();
            let html = &sent.last().expect("no email sent").html;
            let start = html.find("token=").expect("no token in email") + "token=".len();
            let rest = &html[start..];
            rest[..rest.find('"').unwrap()].to_string()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(email);
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _email: OutgoingEmail) -> Result<(), MailError> {
            Err(MailError::Transport("connection refused".into()))
        }
    }

    fn tokens() -> TokenService {
        TokenService::new("test-secret", Duration::hours(24), Duration::hours(24))
    }

    fn service(store: Arc<MemoryStore>, mailer: Arc<dyn Mailer>) -> AccountService {
        AccountService::new(store, tokens(), mailer, "https://admin.example.com")
    }

    fn sign_up(email: &str) -> SignUpRequest {
        SignUpRequest {
            email: Some(email.into()),
            username: Some("ada".into()),
            role: Some("contributor".into()),
        }
    }

    #[tokio::test]
    async fn sign_up_invite_and_activate() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let accounts = service(store.clone(), mailer.clone());

        let user = accounts.sign_up(sign_up("ada@example.com")).await.unwrap();
        assert_eq!(user.status, UserStatus::Pending);

        accounts
            .send_invite(InviteRequest {
                email: Some("ada@example.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.token_count(), 1);

        let token = mailer.last_token();
        let validated = accounts.validate_token(&token).await.unwrap();
        assert_eq!(validated.id, user.id);

        // validation does not consume the token
        assert!(accounts.validate_token(&token).await.is_ok());

        let activated = accounts
            .set_password(SetPasswordRequest {
                token: Some(token.clone()),
                password: Some("correct horse battery".into()),
            })
            .await
            .unwrap();
        assert_eq!(activated.status, UserStatus::Active);
        assert_eq!(store.token_count(), 0);

        // one-time use
        assert!(matches!(
            accounts.validate_token(&token).await,
            Err(AuthError::InvalidToken)
        ));

        let signed_in = accounts
            .sign_in(SignInRequest {
                email: Some("ADA@example.com".into()),
                password: Some("correct horse battery".into()),
            })
            .await
            .unwrap();
        assert_eq!(signed_in.user.id, user.id);
        assert_eq!(accounts.tokens().verify(&signed_in.token).unwrap().user_id, user.id);
    }

    #[tokio::test]
    async fn failed_email_removes_user_created_by_the_invite() {
        let store = Arc::new(MemoryStore::default());
        let accounts = service(store.clone(), Arc::new(FailingMailer));

        let result = accounts
            .send_invite(InviteRequest {
                email: Some("new@example.com".into()),
                username: Some("newbie".into()),
                role: None,
            })
            .await;

        assert!(matches!(result, Err(AuthError::Mail(_))));
        assert_eq!(store.user_count(), 0);
        assert_eq!(store.token_count(), 0);
    }

    #[tokio::test]
    async fn failed_email_restores_existing_user() {
        let store = Arc::new(MemoryStore::default());
        let id = store.insert_active("old@example.com", "long enough password");
        let accounts = service(store.clone(), Arc::new(FailingMailer));

        let result = accounts
            .send_invite(InviteRequest {
                email: Some("old@example.com".into()),
                ..Default::default()
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.user_count(), 1);
        assert_eq!(store.status_of(id), Some(UserStatus::Active));
        assert_eq!(store.token_count(), 0);
    }

    #[tokio::test]
    async fn invite_for_unknown_email_without_username_is_not_found() {
        let store = Arc::new(MemoryStore::default());
        let accounts = service(store.clone(), Arc::new(RecordingMailer::default()));

        let result = accounts
            .send_invite(InviteRequest {
                email: Some("ghost@example.com".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test]
    async fn invite_creates_user_with_default_role() {
        let store = Arc::new(MemoryStore::default());
        let accounts = service(store.clone(), Arc::new(RecordingMailer::default()));

        let user = accounts
            .send_invite(InviteRequest {
                email: Some("fresh@example.com".into()),
                username: Some("fresh".into()),
                role: None,
            })
            .await
            .unwrap();
        assert_eq!(user.role, DEFAULT_INVITE_ROLE);
        assert_eq!(user.status, UserStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_a_validation_error() {
        let store = Arc::new(MemoryStore::default());
        let accounts = service(store, Arc::new(RecordingMailer::default()));

        accounts.sign_up(sign_up("dup@example.com")).await.unwrap();
        let err = accounts.sign_up(sign_up("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(ref v) if v.field == "email"));
    }

    #[tokio::test]
    async fn stored_expiry_is_enforced_independently() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let accounts = service(store.clone(), mailer.clone());

        accounts.sign_up(sign_up("late@example.com")).await.unwrap();
        accounts
            .send_invite(InviteRequest {
                email: Some("late@example.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        store.expire_tokens();

        assert!(matches!(
            accounts.validate_token(&mailer.last_token()).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn session_token_is_not_an_invite_token() {
        let store = Arc::new(MemoryStore::default());
        let id = store.insert_active("s@example.com", "long enough password");
        let accounts = service(store, Arc::new(RecordingMailer::default()));

        let session = accounts.tokens().issue_session_token(id).unwrap();
        assert!(matches!(
            accounts.validate_token(&session).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            accounts.validate_token("garbage").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn short_password_is_rejected_and_token_kept() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let accounts = service(store.clone(), mailer.clone());

        accounts.sign_up(sign_up("pw@example.com")).await.unwrap();
        accounts
            .send_invite(InviteRequest {
                email: Some("pw@example.com".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = accounts
            .set_password(SetPasswordRequest {
                token: Some(mailer.last_token()),
                password: Some("short".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(store.token_count(), 1);
    }

    #[tokio::test]
    async fn sign_in_failures_are_uniform() {
        let store = Arc::new(MemoryStore::default());
        store.insert_active("a@example.com", "right password");
        let pending = store
            .create_user(NewUser {
                email: "p@example.com".into(),
                username: "p".into(),
                role: "admin".into(),
            })
            .await
            .unwrap();
        let accounts = service(store, Arc::new(RecordingMailer::default()));

        let attempts = [
            ("a@example.com", "wrong password"),
            ("nobody@example.com", "right password"),
            (pending.email.as_str(), "right password"),
        ];
        for (email, password) in attempts {
            let err = accounts
                .sign_in(SignInRequest {
                    email: Some(email.into()),
                    password: Some(password.into()),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
            assert_eq!(err.to_string(), "Invalid email or password");
        }
    }
}
