//! Game achievements: player status merged with the game schema and global
//! unlock rates.

use super::SteamClient;
use crate::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write as _;

const PLAYER_ACHIEVEMENTS_PATH: &str = "ISteamUserStats/GetPlayerAchievements/v1/";
const SCHEMA_PATH: &str = "ISteamUserStats/GetSchemaForGame/v2/";
const GLOBAL_PERCENTAGES_PATH: &str =
    "ISteamUserStats/GetGlobalAchievementPercentagesForApp/v0002/";

/// One achievement of a game as seen by the configured player.
#[derive(Debug, Clone, PartialEq)]
pub struct Achievement {
    /// Internal achievement key.
    pub api_name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Achievement description.
    pub description: String,
    /// Whether the player has unlocked it.
    pub unlocked: bool,
    /// Share of all players who unlocked it, in percent.
    pub global_percent: f64,
}

/// Outcome of an achievements lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum AchievementReport {
    /// Steam returned no achievement list for the player.
    NoPlayerData,
    /// The game schema lists no achievements.
    NoSchema,
    /// Merged achievements, in schema order.
    Achievements(Vec<Achievement>),
}

// ============================================================================
// Upstream payloads
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlayerAchievementsResponse {
    #[serde(default)]
    pub playerstats: PlayerStats,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PlayerStats {
    #[serde(default)]
    pub achievements: Vec<PlayerAchievement>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlayerAchievement {
    pub apiname: String,
    #[serde(default)]
    pub achieved: i64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SchemaResponse {
    #[serde(default)]
    pub game: SchemaGame,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SchemaGame {
    #[serde(default, rename = "availableGameStats")]
    pub available_game_stats: AvailableGameStats,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AvailableGameStats {
    #[serde(default)]
    pub achievements: Vec<SchemaAchievement>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SchemaAchievement {
    pub name: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GlobalPercentagesResponse {
    #[serde(default)]
    pub achievementpercentages: GlobalPercentages,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GlobalPercentages {
    #[serde(default)]
    pub achievements: Vec<GlobalPercentage>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GlobalPercentage {
    pub name: String,
    #[serde(default)]
    pub percent: Percent,
}

/// Steam has served this field both as a number and as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Percent {
    Number(f64),
    Text(String),
}

impl Default for Percent {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

impl Percent {
    fn value(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }
}

// ============================================================================
// Merge and format
// ============================================================================

/// Merges player status and global rates into the schema.
///
/// The result has exactly one entry per schema achievement, in schema order.
/// Achievements the player list does not mention count as locked; missing
/// global rates count as 0%.
pub(crate) fn merge_achievements(
    schema: &[SchemaAchievement],
    player: &[PlayerAchievement],
    global: &[GlobalPercentage],
) -> Vec<Achievement> {
    let unlocked: HashMap<&str, bool> = player
        .iter()
        .map(|a| (a.apiname.as_str(), a.achieved == 1))
        .collect();
    let percents: HashMap<&str, f64> = global
        .iter()
        .map(|g| (g.name.as_str(), g.percent.value()))
        .collect();

    schema
        .iter()
        .map(|entry| Achievement {
            api_name: entry.name.clone(),
            display_name: entry
                .display_name
                .clone()
                .unwrap_or_else(|| entry.name.clone()),
            description: entry
                .description
                .clone()
                .unwrap_or_else(|| "No description".to_string()),
            unlocked: unlocked.get(entry.name.as_str()).copied().unwrap_or(false),
            global_percent: percents.get(entry.name.as_str()).copied().unwrap_or(0.0),
        })
        .collect()
}

/// Renders an achievements report as tool text.
#[must_use]
pub fn format_achievement_report(app_id: u32, report: &AchievementReport) -> String {
    match report {
        AchievementReport::NoPlayerData => {
            format!("Info: No achievement data available for AppID {app_id}.")
        },
        AchievementReport::NoSchema => {
            format!("Info: No achievement schema found for AppID {app_id}.")
        },
        AchievementReport::Achievements(list) => {
            let mut out = format!("Achievements for AppID {app_id}:\n\n");
            for (i, a) in list.iter().enumerate() {
                if i > 0 {
                    out.push_str("\n\n");
                }
                let _ = write!(
                    out,
                    "{} | Unlocked: {} | Global Unlock Rate: {:.2}%\nDescription: {}",
                    a.display_name,
                    if a.unlocked { "Yes" } else { "No" },
                    a.global_percent,
                    a.description
                );
            }
            out
        },
    }
}

impl SteamClient {
    /// Fetches the configured player's achievements for a game.
    ///
    /// Requests player status first, then the schema, then global rates,
    /// stopping early when the player or schema list is empty.
    ///
    /// # Errors
    ///
    /// Returns `MissingConfig` without credentials, or `OperationFailed` when
    /// any of the three requests fails.
    pub fn game_achievements(&self, app_id: u32) -> Result<AchievementReport> {
        let (key, steam_id) = self.require_credentials()?;
        let app = app_id.to_string();

        let player: PlayerAchievementsResponse = self.get_json(
            "get_player_achievements",
            &self.api_url(PLAYER_ACHIEVEMENTS_PATH),
            &[
                ("key", key.to_string()),
                ("steamid", steam_id.to_string()),
                ("appid", app.clone()),
            ],
        )?;
        let player = player.playerstats.achievements;
        if player.is_empty() {
            tracing::debug!(app_id, "No player achievement data");
            return Ok(AchievementReport::NoPlayerData);
        }

        let schema: SchemaResponse = self.get_json(
            "get_schema_for_game",
            &self.api_url(SCHEMA_PATH),
            &[("key", key.to_string()), ("appid", app.clone())],
        )?;
        let schema = schema.game.available_game_stats.achievements;
        if schema.is_empty() {
            tracing::debug!(app_id, "No achievement schema");
            return Ok(AchievementReport::NoSchema);
        }

        let global: GlobalPercentagesResponse = self.get_json(
            "get_global_achievement_percentages",
            &self.api_url(GLOBAL_PERCENTAGES_PATH),
            &[("gameid", app), ("format", "json".to_string())],
        )?;

        let merged = merge_achievements(
            &schema,
            &player,
            &global.achievementpercentages.achievements,
        );
        tracing::debug!(app_id, count = merged.len(), "Merged achievements");
        Ok(AchievementReport::Achievements(merged))
    }
}
