//! Citation formatting (§4.9).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::Source;

/// The five supported citation styles; an unrecognized style name falls
/// back to APA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationStyle {
    Apa,
    Mla,
    Chicago,
    Harvard,
    Ieee,
}

impl CitationStyle {
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mla" => CitationStyle::Mla,
            "chicago" => CitationStyle::Chicago,
            "harvard" => CitationStyle::Harvard,
            "ieee" => CitationStyle::Ieee,
            _ => CitationStyle::Apa,
        }
    }
}

/// A formatted bibliography: the numbered/alphabetized citation list plus
/// the style it was built with.
#[derive(Debug, Clone)]
pub struct Bibliography {
    pub style: CitationStyle,
    pub entries: Vec<String>,
}

impl Bibliography {
    #[must_use]
    pub fn rendered(&self) -> String {
        self.entries.join("\n")
    }
}

fn year_of(source: &Source) -> String {
    source
        .publication_date
        .as_deref()
        .and_then(|date| date.split(['-', '/']).next())
        .filter(|y| y.chars().all(|c| c.is_ascii_digit()) && y.len() == 4)
        .map(str::to_string)
        .unwrap_or_else(|| "n.d.".to_string())
}

/// Normalize an author name for APA (`Last, F. M.`) or MLA (`Last, First`).
fn normalize_author(author: &str, style: CitationStyle) -> String {
    let author = author.trim();
    if author.is_empty() {
        return String::new();
    }

    let parts: Vec<&str> = author.split_whitespace().collect();
    let Some((last, rest)) = parts.split_last() else {
        return author.to_string();
    };

    match style {
        CitationStyle::Apa => {
            let initials = rest
                .iter()
                .map(|given| format!("{}.", given.chars().next().unwrap_or_default()))
                .collect::<Vec<_>>()
                .join(" ");
            if initials.is_empty() {
                (*last).to_string()
            } else {
                format!("{last}, {initials}")
            }
        }
        CitationStyle::Mla => {
            if rest.is_empty() {
                (*last).to_string()
            } else {
                format!("{}, {}", last, rest.join(" "))
            }
        }
        _ => author.to_string(),
    }
}

/// Collapse doubled punctuation and whitespace left behind by missing
/// fields (§4.9: "Empty fields leave no trailing separators").
fn cleanup(text: &str) -> String {
    static DOUBLE_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*,").unwrap());
    static DOUBLE_PERIOD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s*\.").unwrap());
    static EMPTY_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*\)").unwrap());
    static RUNS_OF_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());
    static LEADING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[,.\s]+").unwrap());

    let mut text = text.to_string();
    for _ in 0..3 {
        text = DOUBLE_COMMA.replace_all(&text, ",").to_string();
        text = DOUBLE_PERIOD.replace_all(&text, ".").to_string();
    }
    text = EMPTY_PARENS.replace_all(&text, "").to_string();
    text = RUNS_OF_SPACE.replace_all(&text, " ").to_string();
    text = LEADING_PUNCT.replace(&text, "").to_string();
    text.trim().to_string()
}

/// Format a single `Source` per `style` (§4.9). `article` sources are those
/// with a known `publication_date`; all others render as `website`.
#[must_use]
pub fn format_citation(source: &Source, style: CitationStyle) -> String {
    let is_article = source.publication_date.is_some();
    let year = year_of(source);
    let author_apa_mla = normalize_author(source.author.as_deref().unwrap_or(""), style);
    let author_raw = source.author.as_deref().unwrap_or("").to_string();
    let has_author = !author_raw.trim().is_empty();

    let raw = match style {
        CitationStyle::Apa => {
            if !has_author {
                format!("{}. {}.", source.title, source.site_name)
            } else if is_article {
                format!(
                    "{} ({}). {}. {}. {}",
                    author_apa_mla, year, source.title, source.site_name, source.url
                )
            } else {
                format!(
                    "{}. ({}). {}. Retrieved from {}",
                    author_apa_mla, year, source.title, source.url
                )
            }
        }
        CitationStyle::Mla => {
            if !has_author {
                format!("{}. {}.", source.title, source.site_name)
            } else if is_article {
                format!(
                    "{}. \"{}.\" {}, {}, {}.",
                    author_apa_mla, source.title, source.site_name, year, source.url
                )
            } else {
                format!(
                    "\"{}.\" {}, {}, {}.",
                    source.title, source.site_name, year, source.url
                )
            }
        }
        CitationStyle::Chicago => {
            if !has_author {
                format!("{}. {}.", source.title, source.site_name)
            } else if is_article {
                format!(
                    "{}. \"{}.\" {} ({}). {}.",
                    author_raw, source.title, source.site_name, year, source.url
                )
            } else {
                format!(
                    "\"{}.\" {}. Accessed {}. {}.",
                    source.title,
                    source.site_name,
                    source.access_date.format("%Y-%m-%d"),
                    source.url
                )
            }
        }
        CitationStyle::Harvard => {
            if !has_author {
                format!("{}. {}.", source.title, source.site_name)
            } else {
                format!(
                    "{} {}, '{}', {}, viewed {}, <{}>.",
                    author_raw,
                    year,
                    source.title,
                    source.site_name,
                    source.access_date.format("%Y-%m-%d"),
                    source.url
                )
            }
        }
        CitationStyle::Ieee => {
            if !has_author {
                format!("{}: {}.", source.site_name, source.title)
            } else {
                format!(
                    "{}, \"{},\" {}, {}. [Online]. Available: {}",
                    author_raw, source.title, source.site_name, year, source.url
                )
            }
        }
    };

    cleanup(&raw)
}

/// Build a bibliography from `sources` (already expected sorted descending
/// by reliability per §4.6 step 3): alphabetical by formatted entry for
/// APA/MLA/Harvard/Chicago, numbered `[n]` for IEEE (stripping any leading
/// `[n]` the per-source formatter might have emitted, though it never
/// does — §4.9 assigns numbering only here).
#[must_use]
pub fn format_bibliography(sources: &[Source], style: CitationStyle) -> Bibliography {
    static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[\d+\]\s*").unwrap());

    let mut entries: Vec<String> = sources.iter().map(|s| format_citation(s, style)).collect();

    let entries = if style == CitationStyle::Ieee {
        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let stripped = LEADING_NUMBER.replace(entry, "");
                format!("[{}] {}", i + 1, stripped)
            })
            .collect()
    } else {
        entries.sort();
        entries
    };

    Bibliography { style, entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn source(author: Option<&str>, publication_date: Option<&str>) -> Source {
        Source {
            url: "https://example.com/article".into(),
            title: "A Great Article".into(),
            author: author.map(str::to_string),
            publication_date: publication_date.map(str::to_string),
            site_name: "example.com".into(),
            content: "content".into(),
            snippet: "snippet".into(),
            access_date: Utc::now(),
            reliability: 0.8,
            content_hash: "abc".into(),
        }
    }

    #[test]
    fn apa_article_includes_author_year_and_site() {
        let s = source(Some("Jane Mary Doe"), Some("2023-04-01"));
        let citation = format_citation(&s, CitationStyle::Apa);
        assert!(citation.contains("Doe, J. M."));
        assert!(citation.contains("(2023)"));
        assert!(citation.contains(&s.url));
    }

    #[test]
    fn apa_website_uses_retrieved_from() {
        let s = source(Some("Jane Doe"), None);
        let citation = format_citation(&s, CitationStyle::Apa);
        assert!(citation.contains("Retrieved from"));
    }

    #[test]
    fn missing_author_falls_back_without_trailing_separators() {
        let s = source(None, Some("2023-04-01"));
        let citation = format_citation(&s, CitationStyle::Apa);
        assert_eq!(citation, format!("{}. {}.", s.title, s.site_name));
        assert!(!citation.contains(",,"));
    }

    #[test]
    fn missing_year_renders_as_nd() {
        let s = source(Some("Jane Doe"), Some("not-a-date"));
        let citation = format_citation(&s, CitationStyle::Apa);
        assert!(citation.contains("n.d."));
    }

    #[test]
    fn unknown_style_falls_back_to_apa() {
        assert_eq!(CitationStyle::parse("unknown-style"), CitationStyle::Apa);
    }

    #[test]
    fn ieee_bibliography_numbers_entries() {
        let sources = vec![
            source(Some("Alice A"), Some("2022-01-01")),
            source(Some("Bob B"), Some("2021-01-01")),
        ];
        let bib = format_bibliography(&sources, CitationStyle::Ieee);
        assert!(bib.entries[0].starts_with("[1]"));
        assert!(bib.entries[1].starts_with("[2]"));
    }

    #[test]
    fn apa_bibliography_is_alphabetized() {
        let sources = vec![
            source(Some("Zed Z"), Some("2022-01-01")),
            source(Some("Alice A"), Some("2022-01-01")),
        ];
        let bib = format_bibliography(&sources, CitationStyle::Apa);
        assert!(bib.entries[0] < bib.entries[1]);
    }
}
