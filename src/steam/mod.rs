//! Steam Web API and Steam Community client.
//!
//! One blocking HTTP client serves every operation. Each call is a single
//! request (or a fixed short sequence) with no retry; failures are reported
//! as [`Error::OperationFailed`] naming the operation.

mod achievements;
mod guide_content;
mod guides;
mod library;

pub use achievements::{Achievement, AchievementReport, format_achievement_report};
pub use guide_content::{
    GuideContent, GuideSection, ScoredSection, format_guide_content, parse_guide_sections,
    rank_sections,
};
pub use guides::{
    GuideSummary, extract_guide_id, format_guide_search, parse_guide_fragment,
    parse_guide_search_page,
};
pub use library::{OwnedGame, RecentGame, format_owned_games, format_recent_games};

use crate::config::{GuideSettings, HttpSettings, SteamMcpConfig};
use crate::embedding::{Embedder, FastEmbedEmbedder};
use crate::{Error, Result};
use regex::Regex;
use reqwest::Url;
use reqwest::blocking::Response;
use reqwest::header::{COOKIE, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

/// Cookies that pre-answer Steam's mature content and age checks.
const AGE_GATE_COOKIES: &str = "wants_mature_content=1; lastagecheckage=1; birthtime=1";

/// Marker of the mature content interstitial.
const PROCEED_MARKER: &str = r#"onclick="Proceed()""#;

// Allow expect() on static regex patterns - these are guaranteed to compile
#[allow(clippy::expect_used)]
static PROCEED_REDIRECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"document\.location\s*=\s*"([^"]+)""#).expect("static regex: proceed redirect")
});

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: &HttpSettings) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build Steam HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Client for the Steam Web API and Steam Community pages.
pub struct SteamClient {
    /// Steam Web API key.
    api_key: Option<SecretString>,
    /// Player Steam id.
    steam_id: Option<String>,
    /// Web API base URL, without trailing slash.
    api_base_url: String,
    /// Community base URL, without trailing slash.
    community_base_url: String,
    /// User agent for community pages.
    user_agent: String,
    /// Guide search and ranking limits.
    guides: GuideSettings,
    /// Embedder for ranking sections of large guides.
    embedder: Arc<dyn Embedder>,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl SteamClient {
    /// Creates a client from configuration.
    #[must_use]
    pub fn new(config: &SteamMcpConfig) -> Self {
        Self {
            api_key: config.steam.api_key.clone(),
            steam_id: config.steam.steam_id.clone(),
            api_base_url: config.steam.api_base_url.trim_end_matches('/').to_string(),
            community_base_url: config
                .steam
                .community_base_url
                .trim_end_matches('/')
                .to_string(),
            user_agent: config.http.user_agent.clone(),
            guides: config.guides,
            embedder: Arc::new(FastEmbedEmbedder::new()),
            client: build_http_client(&config.http),
        }
    }

    /// Replaces the embedder used for section ranking.
    #[must_use]
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    /// Returns true when both the API key and the Steam id are configured.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.steam_id.is_some()
    }

    /// Returns the API key and Steam id, or `MissingConfig`.
    fn require_credentials(&self) -> Result<(&str, &str)> {
        match (&self.api_key, &self.steam_id) {
            (Some(key), Some(id)) => Ok((key.expose_secret(), id.as_str())),
            (None, None) => Err(Error::MissingConfig(
                "environment variables API_KEY and STEAM_ID are not set".to_string(),
            )),
            (None, Some(_)) => Err(Error::MissingConfig(
                "environment variable API_KEY is not set".to_string(),
            )),
            (Some(_), None) => Err(Error::MissingConfig(
                "environment variable STEAM_ID is not set".to_string(),
            )),
        }
    }

    /// Builds a Web API URL from an interface path such as
    /// `ISteamUserStats/GetSchemaForGame/v2/`.
    fn api_url(&self, path: &str) -> String {
        format!("{}/{path}", self.api_base_url)
    }

    /// Builds a community URL with form-encoded query parameters.
    fn community_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let base = format!("{}/{path}", self.community_base_url);
        Url::parse_with_params(&base, params).map_err(|e| Error::operation("build_url", e))
    }

    /// Performs a Web API GET and decodes the JSON body.
    ///
    /// Any non-success status is an error.
    fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let span = tracing::info_span!("steam.request", operation, kind = "api");
        let _guard = span.enter();
        let start = Instant::now();

        let result = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| send_error(operation, &e))
            .and_then(|response| check_status(operation, response))
            .and_then(|response| {
                response
                    .json::<T>()
                    .map_err(|e| Error::operation(operation, format!("decode error: {e}")))
            });

        record_request(operation, result.is_ok(), start);
        result
    }

    /// Fetches a community page, passing Steam's age gate.
    ///
    /// The request carries the age-gate cookies. If Steam still answers with
    /// the `Proceed()` interstitial, the `document.location` target is fetched
    /// instead; when there is no target, or the request ended on an
    /// `/agecheck/` page, the original URL is requested once more. The status
    /// is checked after this step.
    fn fetch_community_page(&self, operation: &str, url: &Url) -> Result<String> {
        let span = tracing::info_span!("steam.request", operation, kind = "community");
        let _guard = span.enter();
        let start = Instant::now();

        let result = self.fetch_past_age_gate(operation, url);

        record_request(operation, result.is_ok(), start);
        result
    }

    fn fetch_past_age_gate(&self, operation: &str, url: &Url) -> Result<String> {
        let response = self.community_get(operation, url.clone())?;
        let landed_on_agecheck = response.url().path().contains("/agecheck/");
        let landed_url = response.url().clone();
        let status = response.status();
        let body = read_body(operation, response)?;

        let (status, body) = if body.contains(PROCEED_MARKER) {
            let target = PROCEED_REDIRECT
                .captures(&body)
                .and_then(|caps| caps.get(1))
                .and_then(|m| landed_url.join(m.as_str()).ok());
            tracing::debug!(redirect = ?target.as_ref().map(Url::as_str), "Passing age gate");
            let response = self.community_get(operation, target.unwrap_or_else(|| url.clone()))?;
            let status = response.status();
            (status, read_body(operation, response)?)
        } else if landed_on_agecheck {
            tracing::debug!("Redirected to age check, retrying");
            let response = self.community_get(operation, url.clone())?;
            let status = response.status();
            (status, read_body(operation, response)?)
        } else {
            (status, body)
        };

        if !status.is_success() {
            tracing::warn!(operation, status = %status, "Steam Community returned error status");
            return Err(Error::operation(
                operation,
                format!("upstream returned status {status}"),
            ));
        }

        Ok(body)
    }

    fn community_get(&self, operation: &str, url: Url) -> Result<Response> {
        self.client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(COOKIE, AGE_GATE_COOKIES)
            .send()
            .map_err(|e| send_error(operation, &e))
    }
}

impl std::fmt::Debug for SteamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("steam_id", &self.steam_id)
            .field("api_base_url", &self.api_base_url)
            .field("community_base_url", &self.community_base_url)
            .field("guides", &self.guides)
            .finish_non_exhaustive()
    }
}

fn read_body(operation: &str, response: Response) -> Result<String> {
    response
        .text()
        .map_err(|e| Error::operation(operation, format!("body read error: {e}")))
}

fn check_status(operation: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    tracing::warn!(
        operation,
        status = %status,
        body = %truncate(&body, 200),
        "Steam Web API returned error status"
    );
    Err(Error::operation(
        operation,
        format!("upstream returned status {status}"),
    ))
}

fn send_error(operation: &str, e: &reqwest::Error) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::error!(
        operation,
        error = %e,
        error_kind,
        "Steam request failed"
    );
    Error::operation(operation, format!("{error_kind} error: {e}"))
}

fn record_request(operation: &str, ok: bool, start: Instant) {
    let status = if ok { "success" } else { "error" };
    metrics::counter!(
        "steam_requests_total",
        "operation" => operation.to_string(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "steam_request_duration_ms",
        "operation" => operation.to_string()
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}

/// Truncates to at most `max` characters, appending `...` when cut.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SteamClient {
        SteamClient::new(&SteamMcpConfig::default().with_base_url("http://127.0.0.1:1/"))
    }

    #[test]
    fn test_credentials_missing() {
        let client = client();
        assert!(!client.has_credentials());
        let err = client.require_credentials().unwrap_err();
        assert!(matches!(err, Error::MissingConfig(_)));
        assert!(err.to_string().contains("API_KEY and STEAM_ID"));
    }

    #[test]
    fn test_credentials_partial() {
        let config = SteamMcpConfig::default().with_api_key("k");
        let err = SteamClient::new(&config).require_credentials().unwrap_err();
        assert!(err.to_string().contains("STEAM_ID"));
        assert!(!err.to_string().contains("API_KEY"));
    }

    #[test]
    fn test_credentials_present() {
        let config = SteamMcpConfig::default()
            .with_api_key("key")
            .with_steam_id("7656");
        let client = SteamClient::new(&config);
        assert!(client.has_credentials());
        assert_eq!(client.require_credentials().unwrap(), ("key", "7656"));
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let client = client();
        assert_eq!(
            client.api_url("ISteamUserStats/GetSchemaForGame/v2/"),
            "http://127.0.0.1:1/ISteamUserStats/GetSchemaForGame/v2/"
        );
        let url = client
            .community_url("app/620/guides/", &[("searchText", "boss fight & more")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:1/app/620/guides/?searchText=boss+fight+%26+more"
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = SteamMcpConfig::default().with_api_key("super-secret-key");
        let shown = format!("{:?}", SteamClient::new(&config));
        assert!(shown.contains("[REDACTED]"));
        assert!(!shown.contains("super-secret-key"));
    }

    #[test]
    fn test_proceed_redirect_regex() {
        let body = r#"<a onclick="Proceed()">Go</a><script>document.location = "https://steamcommunity.com/app/1/guides/?x=1";</script>"#;
        let caps = PROCEED_REDIRECT.captures(body).unwrap();
        assert_eq!(&caps[1], "https://steamcommunity.com/app/1/guides/?x=1");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }

    #[test]
    fn test_unreachable_host_is_an_error() {
        let client = client();
        let url = client.community_url("app/1/guides/", &[]).unwrap();
        let err = client.fetch_community_page("search_guides", &url).unwrap_err();
        assert!(err.to_string().contains("search_guides"));
    }
}
