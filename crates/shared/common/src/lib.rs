//! Common utilities shared across all services.
//!
//! This crate provides:
//! - Unified error handling with HTTP response conversion
//! - Configuration structures shared by the services

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};
