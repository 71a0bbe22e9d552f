//! State machine module.

pub mod handlers;
pub mod machine;

pub use handlers::{HandleResult, HandlerContext, handle_line};
pub use machine::{SessionContext, SessionState};
