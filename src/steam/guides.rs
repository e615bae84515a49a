//! Community guide search.
//!
//! Results come from the top-rated guides page of a game. When that page lists
//! nothing, the community hub `homecontent` endpoint is consulted instead.

use super::SteamClient;
use crate::{Error, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::LazyLock;

// Allow expect() on static patterns - these are guaranteed to compile
#[allow(clippy::expect_used)]
static GUIDE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"id=(\d+)").expect("static regex: guide id"));

#[allow(clippy::expect_used)]
static ITEM_CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.workshopItemCollectionContainer")
        .expect("static selector: item container")
});

#[allow(clippy::expect_used)]
static ITEM_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a.workshopItemCollection").expect("static selector: item link")
});

#[allow(clippy::expect_used)]
static ITEM_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".workshopItemTitle").expect("static selector: item title"));

#[allow(clippy::expect_used)]
static ITEM_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".workshopItemShortDesc").expect("static selector: item description")
});

/// Query string of the `homecontent` fallback request.
const HOMECONTENT_PARAMS: [(&str, &str); 8] = [
    ("userreviewsoffset", "0"),
    ("p", "1"),
    ("communityhub", "1"),
    ("workshopitemspreview", "0"),
    ("readytouseitemspreview", "0"),
    ("mtxitemspreview", "0"),
    ("itemspreview", "0"),
    ("curations", "0"),
];

/// A guide listed in search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideSummary {
    /// Guide id, or the raw link when it carries no `id=` parameter.
    pub id: String,
    /// Guide title.
    pub title: String,
    /// Short description shown in listings.
    pub description: String,
    /// Link to the guide page.
    pub link: String,
}

#[derive(Debug, Default, Deserialize)]
struct HomeContent {
    #[serde(default)]
    results_html: String,
}

/// Extracts the numeric guide id from a guide link.
///
/// Returns the link unchanged when it has no `id=<digits>` parameter.
#[must_use]
pub fn extract_guide_id(link: &str) -> String {
    GUIDE_ID
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| link.to_string(), |m| m.as_str().to_string())
}

/// Parses the guides listing page, returning at most `limit` guides.
#[must_use]
pub fn parse_guide_search_page(html: &str, limit: usize) -> Vec<GuideSummary> {
    let document = Html::parse_document(html);
    document
        .select(&ITEM_CONTAINER)
        .filter_map(|item| {
            let link = item.select(&ITEM_LINK).next()?;
            summary_from(item, link)
        })
        .take(limit)
        .collect()
}

/// Parses the `results_html` fragment of the hub endpoint, returning at most
/// `limit` guides.
#[must_use]
pub fn parse_guide_fragment(html: &str, limit: usize) -> Vec<GuideSummary> {
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&ITEM_LINK)
        .filter_map(|link| summary_from(link, link))
        .take(limit)
        .collect()
}

fn summary_from(item: ElementRef<'_>, link: ElementRef<'_>) -> Option<GuideSummary> {
    let href = link.value().attr("href")?.trim().to_string();
    let title = item
        .select(&ITEM_TITLE)
        .next()
        .map(stripped_text)
        .unwrap_or_default();
    let description = item
        .select(&ITEM_DESCRIPTION)
        .next()
        .map(stripped_text)
        .unwrap_or_default();

    Some(GuideSummary {
        id: extract_guide_id(&href),
        title,
        description,
        link: href,
    })
}

/// Joins the element's trimmed, non-empty text nodes with single spaces.
pub(crate) fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders search results as tool text.
#[must_use]
pub fn format_guide_search(app_id: u32, query: &str, guides: &[GuideSummary]) -> String {
    if guides.is_empty() {
        return format!("No guides found for '{query}' (AppID {app_id}).");
    }

    let mut out = format!("Top {} guides for '{query}':", guides.len());
    for (i, guide) in guides.iter().enumerate() {
        let _ = write!(
            out,
            "\n{}. ID: {}\n   Name: {}\n   Description: {}",
            i + 1,
            guide.id,
            guide.title,
            guide.description
        );
    }
    out
}

impl SteamClient {
    /// Searches a game's top-rated community guides.
    ///
    /// An empty list means no guide matched; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns `OperationFailed` when a page cannot be fetched.
    pub fn search_guides(&self, app_id: u32, query: &str) -> Result<Vec<GuideSummary>> {
        let limit = self.guides.search_limit;
        let url = self.community_url(
            &format!("app/{app_id}/guides/"),
            &[("searchText", query), ("browsefilter", "toprated")],
        )?;

        let page = self.fetch_community_page("search_guides", &url)?;
        let guides = parse_guide_search_page(&page, limit);
        if !guides.is_empty() {
            tracing::debug!(app_id, count = guides.len(), "Guides found on listing page");
            return Ok(guides);
        }

        tracing::debug!(app_id, "Listing page empty, trying hub content");
        let url = self.community_url(&format!("app/{app_id}/homecontent/"), &HOMECONTENT_PARAMS)?;
        let body = self.fetch_community_page("search_guides_homecontent", &url)?;
        let fragment = match serde_json::from_str::<HomeContent>(&body) {
            Ok(content) => content.results_html,
            Err(e) if body.trim_start().starts_with('<') => {
                tracing::debug!(error = %e, "Hub content is HTML, parsing directly");
                body
            },
            Err(e) => {
                return Err(Error::operation(
                    "search_guides_homecontent",
                    format!("decode error: {e}"),
                ));
            },
        };

        Ok(parse_guide_fragment(&fragment, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const LISTING: &str = r#"
        <html><body>
        <div class="workshopItemCollectionContainer">
          <a class="workshopItemCollection" href="https://steamcommunity.com/sharedfiles/filedetails/?id=1111&searchtext=boss">
            <div class="workshopItemTitle"> Boss Guide </div>
            <div class="workshopItemShortDesc">Beat <b>every</b> boss</div>
          </a>
        </div>
        <div class="workshopItemCollectionContainer">
          <a class="workshopItemCollection" href="https://steamcommunity.com/sharedfiles/filedetails/?id=2222">
            <div class="workshopItemTitle">100% Achievements</div>
          </a>
        </div>
        <div class="workshopItemCollectionContainer">
          <div class="workshopItemTitle">Broken item without link</div>
        </div>
        </body></html>
    "#;

    #[test_case("https://steamcommunity.com/sharedfiles/filedetails/?id=123456", "123456" ; "plain")]
    #[test_case("/sharedfiles/filedetails/?id=42&searchtext=x", "42" ; "with trailing params")]
    #[test_case("https://example.com/guide", "https://example.com/guide" ; "no id")]
    #[test_case("?id=abc", "?id=abc" ; "non numeric id")]
    fn test_extract_guide_id(link: &str, expected: &str) {
        assert_eq!(extract_guide_id(link), expected);
    }

    #[test]
    fn test_parse_listing_page() {
        let guides = parse_guide_search_page(LISTING, 10);
        assert_eq!(guides.len(), 2);
        assert_eq!(guides[0].id, "1111");
        assert_eq!(guides[0].title, "Boss Guide");
        assert_eq!(guides[0].description, "Beat every boss");
        assert_eq!(guides[1].id, "2222");
        assert_eq!(guides[1].description, "");
    }

    #[test]
    fn test_parse_listing_respects_limit() {
        assert_eq!(parse_guide_search_page(LISTING, 1).len(), 1);
        assert!(parse_guide_search_page(LISTING, 0).is_empty());
    }

    #[test]
    fn test_parse_listing_without_items() {
        assert!(parse_guide_search_page("<html><body>Nothing here</body></html>", 10).is_empty());
    }

    #[test]
    fn test_parse_fragment() {
        let html = r#"<a class="workshopItemCollection" href="?id=77"><div class="workshopItemTitle">Speedrun</div><div class="workshopItemShortDesc">Fast</div></a>"#;
        let guides = parse_guide_fragment(html, 10);
        assert_eq!(guides.len(), 1);
        assert_eq!(guides[0].id, "77");
        assert_eq!(guides[0].title, "Speedrun");
        assert_eq!(guides[0].description, "Fast");
        assert!(parse_guide_fragment("", 10).is_empty());
    }

    #[test]
    fn test_format_guide_search() {
        let guides = vec![GuideSummary {
            id: "1".to_string(),
            title: "T".to_string(),
            description: "D".to_string(),
            link: "?id=1".to_string(),
        }];
        assert_eq!(
            format_guide_search(620, "boss", &guides),
            "Top 1 guides for 'boss':\n1. ID: 1\n   Name: T\n   Description: D"
        );
        assert_eq!(
            format_guide_search(620, "boss", &[]),
            "No guides found for 'boss' (AppID 620)."
        );
    }
}
