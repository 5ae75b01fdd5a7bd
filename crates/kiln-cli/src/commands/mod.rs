//! Command handlers, one module per command family.

pub mod clean;
pub mod completions;
pub mod config;
pub mod features;
pub mod scaffold;
pub mod session;
pub mod tools;
