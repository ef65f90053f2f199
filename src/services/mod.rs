pub mod account_service;
pub mod account_store;
pub mod asset_store;
pub mod mailer;
pub mod resource_service;

pub use account_service::{AccountService, AuthError};
pub use account_store::{AccountStore, PgAccountStore};
pub use asset_store::{AssetError, AssetStore, CloudinaryStore};
pub use mailer::{HttpMailer, LogMailer, MailError, Mailer, OutgoingEmail};
pub use resource_service::{ResourceError, ResourceService};
