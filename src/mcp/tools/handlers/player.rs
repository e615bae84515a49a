//! Handlers for tools that read the configured player's data.

use super::text_result;
use crate::Result;
use crate::mcp::tool_types::{GameAchievementsArgs, NoArgs, parse_args};
use crate::mcp::tools::ToolResult;
use crate::steam::{
    SteamClient, format_achievement_report, format_owned_games, format_recent_games,
};
use serde_json::Value;

/// Executes the game achievements tool.
pub fn execute_game_achievements(client: &SteamClient, arguments: Value) -> Result<ToolResult> {
    let args: GameAchievementsArgs = parse_args(arguments)?;
    let report = client.game_achievements(args.app_id)?;
    Ok(text_result(format_achievement_report(args.app_id, &report)))
}

/// Executes the owned games tool.
pub fn execute_owned_games(client: &SteamClient, arguments: Value) -> Result<ToolResult> {
    let _: NoArgs = parse_args(arguments)?;
    let games = client.owned_games()?;
    Ok(text_result(format_owned_games(&games)))
}

/// Executes the recently played games tool.
pub fn execute_recently_played_games(
    client: &SteamClient,
    arguments: Value,
) -> Result<ToolResult> {
    let _: NoArgs = parse_args(arguments)?;
    let games = client.recently_played_games()?;
    Ok(text_result(format_recent_games(&games)))
}
