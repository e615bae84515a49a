//! MCP tool implementations.
//!
//! Provides tool handlers for the Model Context Protocol.
//!
//! # Module Structure
//!
//! - [`definitions`]: Tool schema definitions (JSON Schema for input validation)
//! - [`handlers`]: Tool execution logic
//!   - `handlers::player`: achievements, owned and recently played games
//!   - `handlers::guides`: guide search and guide content

mod definitions;
mod handlers;

use crate::steam::SteamClient;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Registry of MCP tools bound to a Steam client.
pub struct ToolRegistry {
    /// Available tools.
    tools: HashMap<String, ToolDefinition>,
    /// Client the tools call into.
    client: SteamClient,
}

impl ToolRegistry {
    /// Creates a new tool registry with all Steam tools.
    #[must_use]
    pub fn new(client: SteamClient) -> Self {
        let tools = [
            definitions::game_achievements_tool(),
            definitions::search_guides_tool(),
            definitions::fetch_guide_tool(),
            definitions::owned_games_tool(),
            definitions::recently_played_games_tool(),
        ]
        .into_iter()
        .map(|tool| (tool.name.clone(), tool))
        .collect();

        Self { tools, client }
    }

    /// Returns all tool definitions, sorted by name.
    #[must_use]
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Returns the Steam client the tools call into.
    #[must_use]
    pub const fn client(&self) -> &SteamClient {
        &self.client
    }

    /// Gets a tool definition by name.
    #[must_use]
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Executes a tool with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is unknown, the arguments are invalid, or
    /// the Steam request fails.
    pub fn execute(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let client = &self.client;
        match name {
            "get_game_achievements" => handlers::execute_game_achievements(client, arguments),
            "search_steam_guides" => handlers::execute_search_guides(client, arguments),
            "fetch_steam_guide" => handlers::execute_fetch_guide(client, arguments),
            "get_owned_games" => handlers::execute_owned_games(client, arguments),
            "get_recently_played_games" => {
                handlers::execute_recently_played_games(client, arguments)
            },
            _ => Err(Error::InvalidInput(format!("Unknown tool: {name}"))),
        }
    }
}

/// Definition of an MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for input validation.
    pub input_schema: Value,
}

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the result represents an error.
    #[serde(default)]
    pub is_error: bool,
}

/// Content types that can be returned by tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}
