//! Completion provider domain models and traits

mod message;
mod provider;
mod request;
mod response;

pub use message::{Message, MessageRole};
pub use provider::LlmProvider;
pub use request::LlmRequest;
pub use response::{Choice, ChoiceMessage, LlmResponse, StructuredCompletion};

#[cfg(test)]
pub use provider::mock::MockLlmProvider;
