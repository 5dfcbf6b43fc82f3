//! Wiring of settings, credentials and service handles

pub mod context;
pub mod credentials;
