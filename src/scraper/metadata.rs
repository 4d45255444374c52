//! Page metadata extraction (§4.5 step 7): first non-empty value wins, per
//! key, across a priority list of selectors.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

#[derive(Debug, Clone, Default)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub publication_date: Option<String>,
}

static OG_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property='og:title']").unwrap());
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property='og:description']").unwrap());
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name='description']").unwrap());
static META_AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("meta[name='author']").unwrap());
static OG_ARTICLE_AUTHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property='article:author']").unwrap());
static OG_ARTICLE_PUBLISHED: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property='article:published_time']").unwrap());
static META_DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("meta[name='date']").unwrap());
static TIME_DATETIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time[datetime]").unwrap());
static H1: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static REL_AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("[rel='author']").unwrap());
static CLASS_AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse(".author").unwrap());
static CLASS_BYLINE: Lazy<Selector> = Lazy::new(|| Selector::parse(".byline").unwrap());

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .find_map(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn element_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .find_map(|el| {
            let text = el.text().collect::<String>();
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
}

fn first_non_empty(candidates: Vec<Option<String>>) -> Option<String> {
    candidates.into_iter().flatten().find(|s| !s.trim().is_empty())
}

/// Extract title, description, author and publication date, trying
/// sources in the priority order of §4.5 step 7.
#[must_use]
pub fn extract_metadata(html: &str) -> PageMetadata {
    let document = Html::parse_document(html);

    let title = first_non_empty(vec![
        meta_content(&document, &OG_TITLE),
        element_text(&document, &H1),
    ]);

    let description = first_non_empty(vec![
        meta_content(&document, &OG_DESCRIPTION),
        meta_content(&document, &META_DESCRIPTION),
    ]);

    let author = first_non_empty(vec![
        meta_content(&document, &OG_ARTICLE_AUTHOR),
        meta_content(&document, &META_AUTHOR),
        element_text(&document, &REL_AUTHOR),
        element_text(&document, &CLASS_AUTHOR),
        element_text(&document, &CLASS_BYLINE),
    ]);

    let publication_date = first_non_empty(vec![
        meta_content(&document, &OG_ARTICLE_PUBLISHED),
        meta_content(&document, &META_DATE),
        document
            .select(&TIME_DATETIME)
            .find_map(|el| el.value().attr("datetime"))
            .map(str::to_string),
    ]);

    PageMetadata {
        title,
        description,
        author,
        publication_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn og_title_wins_over_h1() {
        let html = r#"<html><head><meta property="og:title" content="OG Title"></head><body><h1>H1 Title</h1></body></html>"#;
        let meta = extract_metadata(html);
        assert_eq!(meta.title.as_deref(), Some("OG Title"));
    }

    #[test]
    fn falls_back_to_h1_when_no_og_title() {
        let html = "<html><body><h1>H1 Title</h1></body></html>";
        let meta = extract_metadata(html);
        assert_eq!(meta.title.as_deref(), Some("H1 Title"));
    }

    #[test]
    fn author_heuristics_try_rel_then_class() {
        let html = r#"<html><body><span rel="author">Jane Doe</span></body></html>"#;
        let meta = extract_metadata(html);
        assert_eq!(meta.author.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn missing_metadata_is_none() {
        let html = "<html><body><p>no metadata here</p></body></html>";
        let meta = extract_metadata(html);
        assert!(meta.title.is_none());
        assert!(meta.author.is_none());
        assert!(meta.publication_date.is_none());
    }
}
