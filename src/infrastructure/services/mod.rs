mod feedback_service;
mod prompts;

pub use feedback_service::{FeedbackService, DEFAULT_FRESHNESS_WINDOW};
