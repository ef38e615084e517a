//! Error types for aquastat
//!
//! This module defines the error types used throughout the aquastat library.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for aquastat operations
///
/// This enum encompasses all possible errors that can occur during
/// aquastat operations, from IO errors to snapshot parsing failures.
#[derive(Error, Debug)]
pub enum AquastatError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid timezone
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Invalid accounting period name
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Invalid unit system
    #[error("Invalid unit system: {0}")]
    InvalidUnitSystem(String),

    /// Snapshot error with file context
    #[error("Snapshot error in {file}: {error}")]
    Snapshot {
        /// The snapshot file that caused the error
        file: PathBuf,
        /// The error message
        error: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience type alias for Results in aquastat
pub type Result<T> = std::result::Result<T, AquastatError>;
