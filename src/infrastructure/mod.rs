//! Infrastructure layer - cache backends, provider adapters and services

pub mod cache;
pub mod feedback;
pub mod llm;
pub mod logging;
pub mod services;
