//! MCP server implementation.
//!
//! Serves the Steam tools over the Model Context Protocol.
//!
//! ## Tools
//!
//! `get_game_achievements`, `search_steam_guides`, `fetch_steam_guide`,
//! `get_owned_games`, `get_recently_played_games`
//!
//! ## Usage
//!
//! ```bash
//! steam-mcp serve
//! ```
//!
//! ### Desktop assistant configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "steam": {
//!       "command": "steam-mcp",
//!       "args": ["serve"],
//!       "env": { "API_KEY": "...", "STEAM_ID": "..." }
//!     }
//!   }
//! }
//! ```

mod dispatch;
mod server;
mod tool_types;
mod tools;

pub use dispatch::McpMethod;
pub use server::{McpServer, RateLimitConfig, Transport};
pub use tools::{ToolContent, ToolDefinition, ToolRegistry, ToolResult};
