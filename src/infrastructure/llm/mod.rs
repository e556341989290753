mod http_client;
mod openai;
mod resilient;

pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::{DEFAULT_OPENAI_BASE_URL, OpenAiProvider};
pub use resilient::{ResilientClient, SendOptions};
