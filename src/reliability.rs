//! Domain reliability scoring (§4.6).

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::utils::host_of;

/// Longest-domain-suffix reliability table, resolving the ambiguity the
/// distilled spec left open against the original scorer's table.
static BUILTIN_TABLE: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        ("nature.com", 0.95),
        ("science.org", 0.95),
        ("nih.gov", 0.95),
        ("cdc.gov", 0.95),
        ("who.int", 0.95),
        ("nasa.gov", 0.95),
        ("wikipedia.org", 0.75),
        ("reuters.com", 0.85),
        ("apnews.com", 0.85),
        ("bbc.com", 0.85),
        ("nytimes.com", 0.80),
        ("washingtonpost.com", 0.80),
        ("economist.com", 0.80),
        ("forbes.com", 0.70),
        ("techcrunch.com", 0.65),
        ("wired.com", 0.70),
        ("medium.com", 0.50),
        ("wordpress.com", 0.40),
        ("blogspot.com", 0.40),
        ("reddit.com", 0.45),
        ("quora.com", 0.40),
        ("stackoverflow.com", 0.80),
        ("github.com", 0.80),
        ("arxiv.org", 0.85),
        ("jstor.org", 0.90),
        ("sciencedirect.com", 0.90),
    ])
});

const UNKNOWN_DOMAIN_SCORE: f64 = 0.5;
const HTTPS_BONUS: f64 = 0.05;
const TRUSTED_TLD_BONUS: f64 = 0.10;
const MAX_SCORE: f64 = 0.99;

const TRUSTED_TLDS: [&str; 3] = ["edu", "gov", "org"];

/// Scores URLs in `[0, 1]` by domain trustworthiness (§4.6).
#[derive(Debug, Clone, Default)]
pub struct ReliabilityScorer;

impl ReliabilityScorer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Score `url`: longest-suffix match against the built-in table (0.5 if
    /// no suffix matches), then `https` and trusted-TLD bonuses, each
    /// application capped at 0.99.
    #[must_use]
    pub fn score(&self, url: &str) -> f64 {
        let Some(host) = host_of(url) else {
            return UNKNOWN_DOMAIN_SCORE;
        };
        let host = host.to_ascii_lowercase();

        let mut score = Self::lookup_base_score(&host);

        if url.to_ascii_lowercase().starts_with("https://") {
            score = (score + HTTPS_BONUS).min(MAX_SCORE);
        }

        if let Some(tld) = host.rsplit('.').next() {
            if TRUSTED_TLDS.contains(&tld) {
                score = (score + TRUSTED_TLD_BONUS).min(MAX_SCORE);
            }
        }

        score
    }

    fn lookup_base_score(host: &str) -> f64 {
        BUILTIN_TABLE
            .iter()
            .filter(|(domain, _)| host == **domain || host.ends_with(&format!(".{domain}")))
            .max_by_key(|(domain, _)| domain.len())
            .map_or(UNKNOWN_DOMAIN_SCORE, |(_, score)| *score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_scores_from_table() {
        let scorer = ReliabilityScorer::new();
        assert!((scorer.score("https://www.nature.com/articles/x") - 0.99).abs() < 1e-9);
    }

    #[test]
    fn unknown_domain_gets_baseline() {
        let scorer = ReliabilityScorer::new();
        let score = scorer.score("http://totally-unknown-blog.example");
        assert!((score - UNKNOWN_DOMAIN_SCORE).abs() < 1e-9);
    }

    #[test]
    fn http_misses_the_https_bonus() {
        let scorer = ReliabilityScorer::new();
        let https = scorer.score("https://www.wikipedia.org/wiki/Rust");
        let http = scorer.score("http://www.wikipedia.org/wiki/Rust");
        assert!(https > http);
    }

    #[test]
    fn trusted_tld_bonus_applies_to_unlisted_domains() {
        let scorer = ReliabilityScorer::new();
        let edu_score = scorer.score("https://cs.example.edu/paper");
        let com_score = scorer.score("https://cs.example.com/paper");
        assert!(edu_score > com_score);
    }

    #[test]
    fn subdomain_matches_registered_domain() {
        let scorer = ReliabilityScorer::new();
        let score = scorer.score("https://pubmed.nih.gov/12345");
        assert!((score - 0.99).abs() < 1e-9);
    }

    #[test]
    fn scores_are_capped_at_point_nine_nine() {
        let scorer = ReliabilityScorer::new();
        let score = scorer.score("https://www.nature.com/articles/x");
        assert!(score <= MAX_SCORE);
    }
}
