//! HTTP clients for the external services

pub mod client;
pub mod gemini;
pub mod github;
