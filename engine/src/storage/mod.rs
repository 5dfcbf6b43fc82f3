//! Local storage: settings, on-disk layout and run records

pub mod layout;
pub mod records;
pub mod settings;
