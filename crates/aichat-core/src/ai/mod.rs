pub mod mock;
pub mod openai;

pub use mock::{MockResponder, DEFAULT_MOCK_DELAY};
pub use openai::OpenAIClient;
