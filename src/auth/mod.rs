pub mod cookie;
pub mod password;
pub mod token;

pub use cookie::{clear_session_cookie, session_cookie, token_from_headers, SESSION_COOKIE};
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{hash_token, Claims, TokenError, TokenService};
