//! Tool execution handlers.
//!
//! This module contains the execution logic for all MCP tools,
//! organized into submodules by domain.

mod guides;
mod player;

pub use guides::{execute_fetch_guide, execute_search_guides};
pub use player::{execute_game_achievements, execute_owned_games, execute_recently_played_games};

use super::{ToolContent, ToolResult};

/// Wraps tool output text in a successful result.
fn text_result(text: String) -> ToolResult {
    ToolResult {
        content: vec![ToolContent::Text { text }],
        is_error: false,
    }
}
