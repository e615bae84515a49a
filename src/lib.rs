//! # steam-mcp
//!
//! Steam Community tools for AI assistants, served over the Model Context Protocol.
//!
//! The server exposes a handful of read-only operations:
//!
//! - Game achievements for the configured player, merged with the game schema
//!   and global unlock rates
//! - Top-rated community guide search for a game
//! - Guide content retrieval, with relevant-section extraction for large guides
//! - Owned and recently played games
//!
//! Every operation is a thin request/reshape over the Steam Web API or a public
//! Steam Community page. Upstream failures surface as a single tool error.
//!
//! ## Example
//!
//! ```rust,ignore
//! use steam_mcp::{SteamClient, SteamMcpConfig};
//!
//! let client = SteamClient::new(&SteamMcpConfig::load_default());
//! let guides = client.search_guides(620, "achievements")?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// multiple_crate_versions is inherently crate-level (detects duplicate transitive dependencies).
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod embedding;
pub mod mcp;
pub mod observability;
pub mod steam;

// Re-exports for convenience
pub use config::SteamMcpConfig;
pub use embedding::{Embedder, FastEmbedEmbedder, FlatL2Index};
pub use steam::{
    Achievement, GuideContent, GuideSection, GuideSummary, OwnedGame, RecentGame, SteamClient,
};

/// Error type for steam-mcp operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed tool arguments, empty guide id, oversize query |
/// | `MissingConfig` | `API_KEY` or `STEAM_ID` absent for an authenticated call |
/// | `OperationFailed` | Network failure, non-2xx upstream status, undecodable body |
/// | `FeatureNotEnabled` | HTTP transport requested without the `http` feature |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Required configuration is missing.
    ///
    /// Raised when an operation needs the Steam Web API key or the player's
    /// Steam id and neither the config file nor the environment supplies it.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - The upstream HTTP request fails (timeout, connect, TLS)
    /// - Steam answers with a non-success status
    /// - The response body cannot be decoded
    /// - Configuration files cannot be read or parsed
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

impl Error {
    /// Shorthand for [`Error::OperationFailed`].
    pub fn operation(operation: impl Into<String>, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for steam-mcp operations.
pub type Result<T> = std::result::Result<T, Error>;
