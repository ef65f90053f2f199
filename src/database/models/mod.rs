pub mod blog;
pub mod category;
pub mod media;
pub mod portfolio;
pub mod service;
pub mod setting;
pub mod team;
pub mod testimonial;
pub mod use_case;
pub mod user;
pub mod validate;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::query_builder::{Changeset, TableSpec};
pub use validate::ValidationError;

pub use blog::Blog;
pub use category::Category;
pub use media::Media;
pub use portfolio::Portfolio;
pub use service::Service;
pub use setting::Setting;
pub use team::Team;
pub use testimonial::Testimonial;
pub use use_case::UseCase;
pub use user::{Account, User, UserStatus};

/// How a resource's owning user is resolved on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Unowned,
    /// The session user becomes the owner unless the payload names one.
    DefaultsToSession,
    /// Creation is refused without a valid session; the session user always wins.
    RequiresSession,
}

/// An entity served by the generic CRUD service.
///
/// Reads decode the JSON document produced by
/// [`QueryBuilder::select`](crate::database::query_builder::QueryBuilder::select),
/// so implementors deserialize from snake_case column names and serialize
/// camelCase for the API.
pub trait Resource: DeserializeOwned + Serialize + Send + Sync + Unpin + 'static {
    const TABLE: TableSpec;
    const OWNERSHIP: Ownership = Ownership::Unowned;

    type Create: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;

    fn create_changeset(input: Self::Create) -> Result<Changeset, ValidationError>;
    fn update_changeset(input: Self::Update) -> Result<Changeset, ValidationError>;

    fn assign_owner(_input: &mut Self::Create, _user_id: Uuid) {}
}

/// Embedded category summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub category_for: String,
}

/// Embedded user summary (never carries credentials).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

pub(crate) const CATEGORY_COLUMNS: &[&str] = &["id", "name", "category_for"];
pub(crate) const USER_REF_COLUMNS: &[&str] = &["id", "username", "email"];
