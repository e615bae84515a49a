//! Guide page retrieval and relevant-section selection.

use super::SteamClient;
use super::guides::stripped_text;
use crate::embedding::{Embedder, FlatL2Index};
use crate::{Error, Result};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static GUIDE_CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.guide.subSections").expect("static selector: guide container")
});

#[allow(clippy::expect_used)]
static SECTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.subSection.detailBox").expect("static selector: guide section")
});

#[allow(clippy::expect_used)]
static SECTION_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.subSectionTitle").expect("static selector: section title")
});

#[allow(clippy::expect_used)]
static SECTION_BODY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.subSectionDesc").expect("static selector: section body")
});

/// Separator between ranked sections in tool output.
const RANKED_SEPARATOR: &str = "\n\n---\n\n";

/// One section of a guide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideSection {
    /// Section heading, if the section has one.
    pub title: Option<String>,
    /// Section body, one line per text run.
    pub body: String,
}

impl GuideSection {
    /// Section as plain text: heading line followed by the body.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{}\n{}", self.title.as_deref().unwrap_or("Untitled"), self.body)
    }
}

/// A section picked for a query, with its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSection {
    /// Squared L2 distance between section and query embeddings; lower is closer.
    pub score: f32,
    /// Section text.
    pub text: String,
}

/// Content returned for a guide.
#[derive(Debug, Clone, PartialEq)]
pub enum GuideContent {
    /// The page has no guide section container.
    NoSections,
    /// Whole guide text, sections separated by blank lines.
    Full(String),
    /// Sections most relevant to the query, closest first.
    Ranked(Vec<ScoredSection>),
}

/// Extracts guide sections from a guide page.
///
/// Returns `None` when the page has no section container.
#[must_use]
pub fn parse_guide_sections(html: &str) -> Option<Vec<GuideSection>> {
    let document = Html::parse_document(html);
    let container = document.select(&GUIDE_CONTAINER).next()?;

    Some(
        container
            .select(&SECTION)
            .map(|section| GuideSection {
                title: section
                    .select(&SECTION_TITLE)
                    .next()
                    .map(stripped_text),
                body: section
                    .select(&SECTION_BODY)
                    .next()
                    .map(body_text)
                    .unwrap_or_default(),
            })
            .collect(),
    )
}

/// Body text: each non-empty text run on its own line. Line breaks and
/// element boundaries both split runs.
fn body_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ranks section texts by embedding distance to `query`, returning at most
/// `top_k`. Blank sections are never returned.
///
/// # Errors
///
/// Returns an error if embedding fails or the query is blank.
pub fn rank_sections(
    embedder: &dyn Embedder,
    sections: &[String],
    query: &str,
    top_k: usize,
) -> Result<Vec<ScoredSection>> {
    let candidates: Vec<&str> = sections
        .iter()
        .map(String::as_str)
        .filter(|s| !s.trim().is_empty())
        .collect();
    if candidates.is_empty() || top_k == 0 {
        return Ok(Vec::new());
    }

    let mut index = FlatL2Index::new(embedder.dimensions());
    for vector in embedder.embed_batch(&candidates)? {
        index.add(vector)?;
    }
    let query_vector = embedder.embed(query)?;

    Ok(index
        .search(&query_vector, top_k)?
        .into_iter()
        .map(|hit| ScoredSection {
            score: hit.distance,
            text: candidates[hit.index].to_string(),
        })
        .collect())
}

/// Renders guide content as tool text.
#[must_use]
pub fn format_guide_content(guide_id: &str, content: &GuideContent) -> String {
    match content {
        GuideContent::NoSections => {
            format!("Info: No subsections found for guide ID {guide_id}.")
        },
        GuideContent::Full(text) => text.clone(),
        GuideContent::Ranked(sections) => sections
            .iter()
            .map(|s| format!("[Score: {:.2}]\n{}", s.score, s.text))
            .collect::<Vec<_>>()
            .join(RANKED_SEPARATOR),
    }
}

/// Checks that a guide id is a non-empty run of ASCII digits.
fn validate_guide_id(guide_id: &str) -> Result<()> {
    if !guide_id.is_empty() && guide_id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "guide_id must be numeric, got '{guide_id}'"
        )))
    }
}

impl SteamClient {
    /// Fetches a guide.
    ///
    /// The full text is returned when no query is given or the text is at
    /// most the configured threshold in characters. Otherwise only the
    /// sections closest to the query are returned.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a non-numeric id, or `OperationFailed` when
    /// the page cannot be fetched or sections cannot be ranked.
    pub fn fetch_guide(&self, guide_id: &str, query: Option<&str>) -> Result<GuideContent> {
        let guide_id = guide_id.trim();
        validate_guide_id(guide_id)?;

        let url = self.community_url("sharedfiles/filedetails/", &[("id", guide_id)])?;
        let page = self.fetch_community_page("fetch_guide", &url)?;

        let Some(sections) = parse_guide_sections(&page) else {
            tracing::debug!(guide_id, "Guide page has no section container");
            return Ok(GuideContent::NoSections);
        };

        let texts: Vec<String> = sections.iter().map(GuideSection::text).collect();
        let full_text = texts.join("\n\n");
        let length = full_text.chars().count();

        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let Some(query) = query.filter(|_| length > self.guides.full_text_threshold) else {
            return Ok(GuideContent::Full(full_text));
        };

        tracing::debug!(
            guide_id,
            sections = texts.len(),
            length,
            "Guide exceeds threshold, ranking sections"
        );
        let ranked = rank_sections(self.embedder.as_ref(), &texts, query, self.guides.top_k)
            .map_err(|e| Error::operation("rank_guide_sections", e))?;
        Ok(GuideContent::Ranked(ranked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUIDE_PAGE: &str = r#"
        <html><body>
        <div class="guide subSections">
          <div class="subSection detailBox">
            <div class="subSectionTitle"> Introduction </div>
            <div class="subSectionDesc">Welcome to the guide.<br>Read carefully.</div>
          </div>
          <div class="subSection detailBox">
            <div class="subSectionDesc">Body <b>without</b> a title</div>
          </div>
          <div class="subSection detailBox">
            <div class="subSectionTitle">Empty</div>
          </div>
        </div>
        </body></html>
    "#;

    /// Embeds each text as a one-hot vector keyed by its first byte.
    struct FirstLetterEmbedder;

    impl Embedder for FirstLetterEmbedder {
        fn dimensions(&self) -> usize {
            26
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0; 26];
            let first = text.trim().bytes().next().unwrap_or(b'a').to_ascii_lowercase();
            v[usize::from(first.saturating_sub(b'a')) % 26] = 1.0;
            Ok(v)
        }
    }

    #[test]
    fn test_parse_guide_sections() {
        let sections = parse_guide_sections(GUIDE_PAGE).unwrap();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title.as_deref(), Some("Introduction"));
        assert_eq!(sections[0].body, "Welcome to the guide.\nRead carefully.");
        assert_eq!(sections[1].title, None);
        assert_eq!(sections[1].body, "Body\nwithout\na title");
        assert_eq!(sections[2].body, "");
    }

    #[test]
    fn test_section_text_uses_untitled() {
        let sections = parse_guide_sections(GUIDE_PAGE).unwrap();
        assert_eq!(
            sections[0].text(),
            "Introduction\nWelcome to the guide.\nRead carefully."
        );
        assert!(sections[1].text().starts_with("Untitled\n"));
    }

    #[test]
    fn test_parse_without_container() {
        assert!(parse_guide_sections("<html><body><p>gone</p></body></html>").is_none());
    }

    #[test]
    fn test_rank_sections_orders_by_distance() {
        let sections = vec![
            "apples and more".to_string(),
            "   ".to_string(),
            "bananas".to_string(),
            "blueberries".to_string(),
        ];
        let ranked = rank_sections(&FirstLetterEmbedder, &sections, "berries", 2).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].text, "bananas");
        assert!(ranked[0].score.abs() < f32::EPSILON);
        assert_eq!(ranked[1].text, "blueberries");
    }

    #[test]
    fn test_rank_sections_empty_input() {
        let ranked = rank_sections(&FirstLetterEmbedder, &[], "q", 5).unwrap();
        assert!(ranked.is_empty());
        let ranked = rank_sections(&FirstLetterEmbedder, &["a".to_string()], "q", 0).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_format_ranked() {
        let content = GuideContent::Ranked(vec![
            ScoredSection {
                score: 0.5,
                text: "A\nbody".to_string(),
            },
            ScoredSection {
                score: 1.234,
                text: "B\nbody".to_string(),
            },
        ]);
        assert_eq!(
            format_guide_content("9", &content),
            "[Score: 0.50]\nA\nbody\n\n---\n\n[Score: 1.23]\nB\nbody"
        );
    }

    #[test]
    fn test_format_no_sections_and_full() {
        assert_eq!(
            format_guide_content("9", &GuideContent::NoSections),
            "Info: No subsections found for guide ID 9."
        );
        assert_eq!(
            format_guide_content("9", &GuideContent::Full("text".to_string())),
            "text"
        );
    }

    #[test]
    fn test_validate_guide_id() {
        assert!(validate_guide_id("123456789").is_ok());
        assert!(validate_guide_id("").is_err());
        assert!(validate_guide_id("12a").is_err());
        assert!(validate_guide_id("../1").is_err());
    }
}
