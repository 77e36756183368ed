//! rsfec Common - Shared types and utilities
//!
//! This crate provides the code parameters, error taxonomy and configuration
//! shared by the codec crate and the command line tool.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
