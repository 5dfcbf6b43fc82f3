//! autodeploy library
//!
//! Repository analysis, deployment artifact synthesis and publication, and a
//! guarded natural-language command pipeline.

pub mod analysis;
pub mod app;
pub mod commands;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
