//! Argument types and helper functions for MCP tools.
//!
//! All argument types use `#[serde(deny_unknown_fields)]` so misspelled or
//! unexpected parameters are rejected instead of silently ignored.

use crate::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Maximum allowed length for query fields.
pub const MAX_QUERY_LENGTH: usize = 10_240; // 10 KB

/// Maximum allowed length for guide ids.
pub const MAX_GUIDE_ID_LENGTH: usize = 32;

/// Arguments for `get_game_achievements`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameAchievementsArgs {
    /// Steam application id of the game.
    pub app_id: u32,
}

/// Arguments for `search_steam_guides`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchGuidesArgs {
    /// Steam application id of the game.
    pub app_id: u32,
    /// Keywords to search for.
    pub query: String,
}

/// Arguments for `fetch_steam_guide`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchGuideArgs {
    /// Guide id as listed by `search_steam_guides`.
    pub guide_id: GuideId,
    /// Optional query used to pick sections of large guides.
    pub query: Option<String>,
}

/// Guide ids are accepted as JSON strings or integers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GuideId {
    /// Numeric form.
    Number(u64),
    /// String form.
    Text(String),
}

impl GuideId {
    /// Returns the id as a string.
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// Arguments for tools that take no parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

/// Decodes tool arguments, treating `null` as an empty object.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the arguments do not match `T`.
pub fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| Error::InvalidInput(e.to_string()))
}

/// Validates that a string input does not exceed the maximum allowed length.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the input exceeds `max_length`.
pub fn validate_input_length(input: &str, field_name: &str, max_length: usize) -> Result<()> {
    if input.len() > max_length {
        return Err(Error::InvalidInput(format!(
            "{field_name} exceeds maximum length ({} > {max_length} bytes)",
            input.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_args() {
        let args: SearchGuidesArgs =
            parse_args(json!({"app_id": 620, "query": "portal gun"})).unwrap();
        assert_eq!(args.app_id, 620);
        assert_eq!(args.query, "portal gun");
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = parse_args::<GameAchievementsArgs>(json!({"app_id": 1, "appid": 2})).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_negative_app_id_rejected() {
        assert!(parse_args::<GameAchievementsArgs>(json!({"app_id": -5})).is_err());
        assert!(parse_args::<GameAchievementsArgs>(json!({"app_id": "620"})).is_err());
    }

    #[test]
    fn test_guide_id_string_or_number() {
        let args: FetchGuideArgs = parse_args(json!({"guide_id": 123})).unwrap();
        assert_eq!(args.guide_id.into_string(), "123");
        assert!(args.query.is_none());

        let args: FetchGuideArgs =
            parse_args(json!({"guide_id": "456", "query": "boss"})).unwrap();
        assert_eq!(args.guide_id.into_string(), "456");
        assert_eq!(args.query.as_deref(), Some("boss"));
    }

    #[test]
    fn test_no_args_accepts_null_and_empty() {
        assert!(parse_args::<NoArgs>(Value::Null).is_ok());
        assert!(parse_args::<NoArgs>(json!({})).is_ok());
        assert!(parse_args::<NoArgs>(json!({"x": 1})).is_err());
    }

    #[test]
    fn test_validate_input_length() {
        assert!(validate_input_length("short", "query", 10).is_ok());
        let err = validate_input_length("far too long", "query", 4).unwrap_err();
        assert!(err.to_string().contains("query exceeds maximum length"));
    }
}
