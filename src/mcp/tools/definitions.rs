//! Tool definitions for MCP tools.
//!
//! Contains the JSON Schema definitions for all Steam tools.

use super::ToolDefinition;

/// Defines the game achievements tool.
pub fn game_achievements_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_game_achievements".to_string(),
        description: "Retrieve achievement information for a Steam game, including the player's unlock status and global unlock rates".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "app_id": {
                    "type": "integer",
                    "description": "The AppID of the game to fetch achievements for",
                    "minimum": 0
                }
            },
            "required": ["app_id"]
        }),
    }
}

/// Defines the guide search tool.
pub fn search_guides_tool() -> ToolDefinition {
    ToolDefinition {
        name: "search_steam_guides".to_string(),
        description: "Search top-rated Steam Community guides for a game. Returns the highest-rated matches, each with the guide ID used by fetch_steam_guide".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "app_id": {
                    "type": "integer",
                    "description": "The game's AppID",
                    "minimum": 0
                },
                "query": {
                    "type": "string",
                    "description": "Keywords to filter guides"
                }
            },
            "required": ["app_id", "query"]
        }),
    }
}

/// Defines the guide content tool.
pub fn fetch_guide_tool() -> ToolDefinition {
    ToolDefinition {
        name: "fetch_steam_guide".to_string(),
        description: "Fetch the content of a Steam Community guide. Small guides are returned whole; for large guides only the sections most relevant to the query are returned".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "guide_id": {
                    "type": "string",
                    "description": "The Steam guide ID"
                },
                "query": {
                    "type": "string",
                    "description": "Search query used to select relevant sections of large guides"
                }
            },
            "required": ["guide_id"]
        }),
    }
}

/// Defines the owned games tool.
pub fn owned_games_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_owned_games".to_string(),
        description: "List all games owned by the configured Steam user with their AppIDs and playtimes".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Defines the recently played games tool.
pub fn recently_played_games_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_recently_played_games".to_string(),
        description: "List games the configured Steam user played in the past two weeks".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {}
        }),
    }
}
