//! CLI command implementations.

pub mod analyze;
pub mod cache;
pub mod common;
pub mod config;
pub mod export;
pub mod run;
