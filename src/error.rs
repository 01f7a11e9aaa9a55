//! Error handling for shopsense-rs
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate. Most recorder operations never fail; errors only
//! surface from configuration loading, trace parsing and export delivery.

use thiserror::Error;

/// Main error type for shopsense-rs operations
#[derive(Error, Debug)]
pub enum ShopSenseError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Requested export format is not supported
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// A line of an interaction trace could not be parsed
    #[error("Trace error at line {line}: {message}")]
    Trace { line: usize, message: String },

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ShopSenseError>,
    },
}

impl ShopSenseError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ShopSenseError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for ShopSenseError {
    fn from(err: serde_json::Error) -> Self {
        ShopSenseError::Serialization(err.to_string())
    }
}

/// Result type alias for shopsense-rs operations
pub type Result<T> = std::result::Result<T, ShopSenseError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ShopSenseError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ShopSenseError::Io(e).with_context(f()))
    }
}
