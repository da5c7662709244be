//! Configuration module for cloud-encode
//!
//! Resolves API credentials, input/output locations and polling settings from
//! command line arguments, TOML files and environment variables.

pub mod config;

pub use config::*;
