//! Owned and recently played games.

use super::SteamClient;
use crate::Result;
use serde::Deserialize;

const OWNED_GAMES_PATH: &str = "IPlayerService/GetOwnedGames/v1/";
const RECENT_GAMES_PATH: &str = "IPlayerService/GetRecentlyPlayedGames/v1/";

/// A game in the player's library.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OwnedGame {
    /// Steam application id.
    #[serde(rename = "appid")]
    pub app_id: u32,
    /// Game title.
    #[serde(default)]
    pub name: String,
    /// Total playtime in minutes.
    #[serde(default)]
    pub playtime_forever: u64,
}

/// A game played in the last two weeks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecentGame {
    /// Steam application id.
    #[serde(rename = "appid")]
    pub app_id: u32,
    /// Game title.
    #[serde(default)]
    pub name: String,
    /// Playtime over the last two weeks in minutes.
    #[serde(default)]
    pub playtime_2weeks: u64,
}

#[derive(Debug, Deserialize)]
struct GamesEnvelope<T> {
    #[serde(default = "GamesList::empty")]
    response: GamesList<T>,
}

#[derive(Debug, Deserialize)]
struct GamesList<T> {
    #[serde(default = "Vec::new")]
    games: Vec<T>,
}

impl<T> GamesList<T> {
    const fn empty() -> Self {
        Self { games: Vec::new() }
    }
}

impl SteamClient {
    /// Lists every game the configured player owns, free games included.
    ///
    /// # Errors
    ///
    /// Returns `MissingConfig` without credentials, or `OperationFailed` when
    /// the request fails.
    pub fn owned_games(&self) -> Result<Vec<OwnedGame>> {
        let (key, steam_id) = self.require_credentials()?;
        let envelope: GamesEnvelope<OwnedGame> = self.get_json(
            "get_owned_games",
            &self.api_url(OWNED_GAMES_PATH),
            &[
                ("key", key.to_string()),
                ("steamid", steam_id.to_string()),
                ("include_appinfo", "true".to_string()),
                ("include_played_free_games", "true".to_string()),
            ],
        )?;
        Ok(envelope.response.games)
    }

    /// Lists games the configured player played in the last two weeks.
    ///
    /// # Errors
    ///
    /// Returns `MissingConfig` without credentials, or `OperationFailed` when
    /// the request fails.
    pub fn recently_played_games(&self) -> Result<Vec<RecentGame>> {
        let (key, steam_id) = self.require_credentials()?;
        let envelope: GamesEnvelope<RecentGame> = self.get_json(
            "get_recently_played_games",
            &self.api_url(RECENT_GAMES_PATH),
            &[("key", key.to_string()), ("steamid", steam_id.to_string())],
        )?;
        Ok(envelope.response.games)
    }
}

/// Renders the owned games list as tool text.
#[must_use]
pub fn format_owned_games(games: &[OwnedGame]) -> String {
    std::iter::once(format!("Total games owned: {}", games.len()))
        .chain(games.iter().map(|g| {
            format!(
                "{} (AppID: {}) - Playtime: {} mins",
                g.name, g.app_id, g.playtime_forever
            )
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the recently played list as tool text.
#[must_use]
pub fn format_recent_games(games: &[RecentGame]) -> String {
    if games.is_empty() {
        return "No games played in the last two weeks.".to_string();
    }
    std::iter::once(format!("Recently played games ({} found):", games.len()))
        .chain(games.iter().map(|g| {
            format!(
                "{} (AppID: {}) - Played {} mins in last 2 weeks",
                g.name, g.app_id, g.playtime_2weeks
            )
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owned_games() {
        let json = r#"{"response":{"game_count":2,"games":[
            {"appid":620,"name":"Portal 2","playtime_forever":1234,"img_icon_url":"x"},
            {"appid":70,"name":"Half-Life","playtime_forever":0}
        ]}}"#;
        let envelope: GamesEnvelope<OwnedGame> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.response.games.len(), 2);
        assert_eq!(envelope.response.games[0].app_id, 620);
        assert_eq!(envelope.response.games[0].playtime_forever, 1234);
    }

    #[test]
    fn test_parse_empty_response() {
        let envelope: GamesEnvelope<RecentGame> =
            serde_json::from_str(r#"{"response":{}}"#).unwrap();
        assert!(envelope.response.games.is_empty());

        let envelope: GamesEnvelope<RecentGame> = serde_json::from_str("{}").unwrap();
        assert!(envelope.response.games.is_empty());
    }

    #[test]
    fn test_format_owned_games() {
        let games = vec![OwnedGame {
            app_id: 620,
            name: "Portal 2".to_string(),
            playtime_forever: 90,
        }];
        assert_eq!(
            format_owned_games(&games),
            "Total games owned: 1\nPortal 2 (AppID: 620) - Playtime: 90 mins"
        );
        assert_eq!(format_owned_games(&[]), "Total games owned: 0");
    }

    #[test]
    fn test_format_recent_games() {
        assert_eq!(
            format_recent_games(&[]),
            "No games played in the last two weeks."
        );
        let games = vec![RecentGame {
            app_id: 570,
            name: "Dota 2".to_string(),
            playtime_2weeks: 45,
        }];
        assert_eq!(
            format_recent_games(&games),
            "Recently played games (1 found):\nDota 2 (AppID: 570) - Played 45 mins in last 2 weeks"
        );
    }
}
