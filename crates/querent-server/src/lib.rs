pub mod adapter;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use adapter::{collect_answer, AnswerError};
pub use error::ApiError;
pub use server::{build_router, start, ServerConfig, ServerHandle};
pub use state::AppState;
