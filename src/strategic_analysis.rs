//! Parses the LLM's free-form "identify focus areas" response into a
//! structured [`AnalysisResult`] (§4.7).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{AnalysisResult, FocusArea};

const MAX_FOCUS_AREAS: usize = 5;
const MIN_AREA_LEN: usize = 10;
const MAX_AREA_LEN: usize = 500;
const DEFAULT_PRIORITY: u8 = 3;

static QUESTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)original question analysis:\s*").unwrap());
static GAPS_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)research gaps:\s*").unwrap());
static GAP_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*\d+[.)]\s*(.+?)(?:\s*\[\s*Priority:\s*(\d+)\s*\])?\s*$").unwrap()
});

/// Parses LLM output describing a query's focus areas (§4.7).
#[derive(Debug, Clone, Default)]
pub struct StrategicAnalysisParser;

impl StrategicAnalysisParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse `raw_response` for `original_question`. Returns `None` when no
    /// valid focus area survives extraction, so the orchestrator can
    /// synthesize its fallback (§4.8 step 3).
    #[must_use]
    pub fn parse(&self, original_question: &str, raw_response: &str) -> Option<AnalysisResult> {
        let normalized = normalize_whitespace(raw_response);

        let focus_areas = Self::extract_gap_items(&normalized, original_question);
        if focus_areas.is_empty() {
            return None;
        }

        let confidence = AnalysisResult::compute_confidence(original_question, &focus_areas);
        Some(AnalysisResult {
            original_question: original_question.to_string(),
            focus_areas,
            raw_response: raw_response.to_string(),
            confidence,
            created_at: chrono::Utc::now(),
        })
    }

    /// Extract the substring following the `Original Question Analysis:`
    /// header up to the next blank line, if present.
    #[must_use]
    pub fn extract_question_analysis(raw_response: &str) -> Option<String> {
        let normalized = normalize_whitespace(raw_response);
        let header_match = QUESTION_HEADER.find(&normalized)?;
        let after = &normalized[header_match.end()..];
        let section = after.split("\n\n").next().unwrap_or(after).trim();
        if section.is_empty() {
            None
        } else {
            Some(section.to_string())
        }
    }

    fn extract_gap_items(normalized: &str, source_query: &str) -> Vec<FocusArea> {
        let section = match GAPS_HEADER.find(normalized) {
            Some(header_match) => &normalized[header_match.end()..],
            None => normalized,
        };

        let mut areas = Vec::new();
        for capture in GAP_ITEM.captures_iter(section) {
            let area_text = capture.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if area_text.chars().count() < MIN_AREA_LEN || area_text.chars().count() > MAX_AREA_LEN {
                continue;
            }

            let priority = capture
                .get(2)
                .and_then(|m| m.as_str().parse::<u8>().ok())
                .unwrap_or(DEFAULT_PRIORITY)
                .clamp(1, 5);

            areas.push(FocusArea::new(area_text.to_string(), priority, source_query.to_string()));
            if areas.len() >= MAX_FOCUS_AREAS {
                break;
            }
        }

        areas
    }
}

fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank_run = false;
    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() {
            if !blank_run {
                result.push('\n');
                blank_run = true;
            }
            continue;
        }
        blank_run = false;
        result.push_str(trimmed.trim_start());
        result.push('\n');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Original Question Analysis:\n\
This question asks about the long-term effects of climate change on agriculture.\n\
\n\
Research Gaps:\n\
1. Historical crop yield trends in affected regions [Priority: 1]\n\
2. Economic impact of adaptation strategies [Priority: 2]\n\
3. Too short [Priority: 4]\n\
4. Policy responses across different national governments [Priority: 5]\n";

    #[test]
    fn parses_valid_gap_items() {
        let parser = StrategicAnalysisParser::new();
        let result = parser
            .parse("what are the long term effects of climate change", SAMPLE)
            .unwrap();
        assert_eq!(result.focus_areas.len(), 3);
        assert_eq!(result.focus_areas[0].priority, 1);
        assert_eq!(result.focus_areas[1].priority, 2);
    }

    #[test]
    fn missing_priority_defaults_to_three() {
        let parser = StrategicAnalysisParser::new();
        let text = "Research Gaps:\n1. A sufficiently long focus area with no priority tag at all\n";
        let result = parser.parse("a sample question here", text).unwrap();
        assert_eq!(result.focus_areas[0].priority, 3);
    }

    #[test]
    fn out_of_range_priority_clamps() {
        let parser = StrategicAnalysisParser::new();
        let text = "Research Gaps:\n1. A sufficiently long focus area text here [Priority: 9]\n";
        let result = parser.parse("a sample question here", text).unwrap();
        assert_eq!(result.focus_areas[0].priority, 5);
    }

    #[test]
    fn too_short_area_is_dropped() {
        let parser = StrategicAnalysisParser::new();
        let text = "Research Gaps:\n1. short [Priority: 1]\n";
        assert!(parser.parse("q", text).is_none());
    }

    #[test]
    fn caps_at_five_items() {
        let parser = StrategicAnalysisParser::new();
        let mut text = String::from("Research Gaps:\n");
        for i in 1..=8 {
            text.push_str(&format!("{i}. A perfectly reasonable focus area number {i}\n"));
        }
        let result = parser.parse("q", &text).unwrap();
        assert_eq!(result.focus_areas.len(), MAX_FOCUS_AREAS);
    }

    #[test]
    fn no_valid_items_returns_none() {
        let parser = StrategicAnalysisParser::new();
        assert!(parser.parse("q", "nothing useful here").is_none());
    }

    #[test]
    fn extracts_question_analysis_section() {
        let section = StrategicAnalysisParser::extract_question_analysis(SAMPLE).unwrap();
        assert!(section.contains("long-term effects of climate change"));
    }
}
