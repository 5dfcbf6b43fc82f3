//! Data models

pub mod command;
pub mod deployment;
pub mod repository;
pub mod strategy;
