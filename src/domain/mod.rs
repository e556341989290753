//! Domain layer - Core business logic and entities

pub mod cache;
pub mod error;
pub mod feedback;
pub mod llm;
pub mod retry;

pub use cache::{Cache, CacheCategory, TtlPolicy};
pub use error::DomainError;
pub use feedback::{
    AiFeedback, FeedbackEvaluation, FeedbackPatch, FeedbackPoint, FeedbackRepository,
    FeedbackRequest, FeedbackType, GenerationStage, Severity,
};
pub use llm::{LlmProvider, LlmRequest, LlmResponse, Message, MessageRole};
pub use retry::{with_retry, RetryPolicy};
