pub mod json_body;
pub mod response;
pub mod session_gate;

pub use json_body::JsonBody;
pub use response::{ApiResponse, ApiResult};
pub use session_gate::{is_public_path, session_gate};
