//! External API integrations

pub mod maps;
pub mod openai;
pub mod wipay;

pub use maps::MapsClient;
pub use openai::{AiError, OpenAiClient};
pub use wipay::WiPayClient;
