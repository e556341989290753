//! Feedback domain - drill and simulation evaluations

mod entity;
mod repository;
mod request;
mod state;

pub use entity::{
    AiFeedback, FeedbackEvaluation, FeedbackPatch, FeedbackPoint, FeedbackType, Severity,
    MAX_SCORE,
};
pub use repository::FeedbackRepository;
pub use repository::in_memory::InMemoryFeedbackRepository;
pub use request::{
    parse_uuid, AttemptResponse, FeedbackRequest, ResponseMetric, ValidatedFeedbackRequest,
};
pub use state::GenerationStage;

#[cfg(test)]
pub use repository::MockFeedbackRepository;
