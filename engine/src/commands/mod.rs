//! Natural-language command analysis and guarded execution

pub mod guard;
pub mod history;
pub mod pipeline;
pub mod runner;
