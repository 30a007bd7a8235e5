//! Tracker collaborator for `taiga-stats`.
//!
//! A thin, read-only client for the Taiga REST API. It fetches statuses,
//! stories, custom attribute definitions and values, and converts them into
//! `taiga-stats-core` types. It never mutates tracker state and never
//! retries: every transport or API failure is returned to the caller.

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod client;
mod wire;

pub use client::TaigaClient;
pub use wire::Project;

use thiserror::Error;

/// Errors from tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Network request failed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Tracker answered with a non-success status.
    #[error("API error ({status}) from {url}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        url: String,
        /// Error detail from the response body, if any.
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
