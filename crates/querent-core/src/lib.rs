pub mod errors;
pub mod ids;
pub mod messages;
pub mod provider;
pub mod tokens;
pub mod tools;

pub use errors::GatewayError;
pub use messages::{FailedAction, Message, StepFailure};
