pub mod converter;
pub mod mock;
pub mod openai;
pub mod timeout;

pub use mock::{MockProvider, MockResponse};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use timeout::TimeoutProvider;
