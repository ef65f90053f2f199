// handlers/mod.rs - HTTP handlers
//
// Nine resources share the generic handlers in `resource`; portfolio forms,
// user deletion, asset deletion and the auth flow have their own modules.

pub mod auth;
pub mod health;
pub mod media;
pub mod portfolio;
pub mod resource;
pub mod state;
pub mod user;

pub use state::AppState;
