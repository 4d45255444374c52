//! Prompt construction and deterministic fallbacks for the analysis and
//! summary-synthesis steps (§4.8 steps 3 and 5).

use crate::llm::LlmClient;
use crate::model::FocusArea;
use crate::utils::safe_truncate_chars;

use super::session::SessionArtifact;

/// The initial "identify focus areas" prompt (§4.8 step 3).
#[must_use]
pub fn analysis_prompt(query: &str) -> String {
    format!(
        "Analyze the following research question and identify up to 5 prioritized \
         focus areas that together would answer it thoroughly.\n\n\
         Question: {query}\n\n\
         Respond in exactly this format:\n\
         Original Question Analysis:\n\
         <one paragraph summarizing what the question is really asking>\n\n\
         Research Gaps:\n\
         1. <focus area, at least a few words> [Priority: <1-5>]\n\
         2. <focus area, at least a few words> [Priority: <1-5>]\n"
    )
}

/// A more rigidly templated retry prompt, used once after the first
/// analysis response fails to parse (§4.8 step 3: "retry once with a
/// formatted template").
#[must_use]
pub fn analysis_retry_prompt(query: &str) -> String {
    format!(
        "Respond ONLY in the following format, with no other text.\n\n\
         Original Question Analysis:\n\
         <one sentence>\n\n\
         Research Gaps:\n\
         1. <focus area of at least three words> [Priority: 1]\n\
         2. <focus area of at least three words> [Priority: 2]\n\
         3. <focus area of at least three words> [Priority: 3]\n\n\
         Question: {query}\n"
    )
}

/// The 2-item fallback focus-area set used when analysis never parses
/// after all attempts (§4.8 step 3).
#[must_use]
pub fn fallback_focus_areas(query: &str) -> Vec<FocusArea> {
    let keyword_phrase = query.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
    let keyword_phrase = if keyword_phrase.is_empty() { query.to_string() } else { keyword_phrase };

    vec![
        FocusArea::new(format!("Understanding {query}"), 1, query.to_string()),
        FocusArea::new(format!("Current developments in {keyword_phrase}"), 2, query.to_string()),
    ]
}

/// Per-page summarization prompt (§4.8 step 4c).
#[must_use]
pub fn summarize_prompt(url: &str, content: &str) -> String {
    let excerpt = safe_truncate_chars(content, 6000);
    format!(
        "Summarize the following page in 2-3 sentences, focusing on facts relevant \
         to a research report. URL: {url}\n\n{excerpt}\n\nSummary:"
    )
}

/// Truncate already-sanitized page content to a short fallback summary when
/// the LLM call times out or errors (§4.8 step 4c: "fallback: first 50-500
/// chars of content").
#[must_use]
pub fn fallback_snippet(content: &str) -> String {
    safe_truncate_chars(content.trim(), 500).to_string()
}

/// The "comprehensive research report" prompt (§4.8 step 5).
#[must_use]
pub fn summary_prompt(query: &str, focus_areas: &[FocusArea], artifacts: &[SessionArtifact]) -> String {
    let areas = focus_areas
        .iter()
        .map(|f| format!("- {} (priority {})", f.area, f.priority))
        .collect::<Vec<_>>()
        .join("\n");

    let mut sources = String::new();
    for artifact in artifacts {
        sources.push_str(&format!(
            "- [{}] {} ({})\n  {}\n",
            artifact.focus_area, artifact.title, artifact.url, artifact.summary
        ));
    }
    if sources.is_empty() {
        sources.push_str("(no sources were successfully retrieved)\n");
    }

    format!(
        "Write a comprehensive research report answering the question below, drawing \
         only on the listed sources. Reference sources by URL where relevant.\n\n\
         Original Query: {query}\n\n\
         Focus Areas:\n{areas}\n\n\
         Sources:\n{sources}\n\
         Report:"
    )
}

/// Deterministic fallback summary (§4.8 step 5) used when the LLM fails to
/// produce a report of at least 100 characters after all attempts.
#[must_use]
pub fn fallback_summary(focus_areas: &[FocusArea], source_count: usize) -> String {
    let areas = focus_areas.iter().map(|f| f.area.as_str()).collect::<Vec<_>>().join("; ");
    format!(
        "Research into the following areas drew on {source_count} source(s): {areas}. \
         A narrative summary could not be generated; see the cited sources for full context."
    )
}

/// Run the "comprehensive research report" synthesis with up to
/// `max_attempts` tries, falling back to a deterministic summary if every
/// attempt fails or produces fewer than 100 characters (§4.8 step 5).
pub async fn synthesize_summary(
    llm: &dyn LlmClient,
    query: &str,
    focus_areas: &[FocusArea],
    artifacts: &[SessionArtifact],
    max_attempts: u32,
) -> String {
    let prompt = summary_prompt(query, focus_areas, artifacts);

    for attempt in 0..max_attempts {
        match llm.complete(&prompt, Some(800), None).await {
            Ok(text) if text.trim().chars().count() >= 100 => return text.trim().to_string(),
            Ok(_) => log::warn!("synthesis attempt {} produced too short a summary", attempt + 1),
            Err(e) => log::warn!("synthesis attempt {} failed: {e}", attempt + 1),
        }
    }

    fallback_summary(focus_areas, artifacts.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_focus_areas_has_two_prioritized_items() {
        let areas = fallback_focus_areas("what is quantum computing");
        assert_eq!(areas.len(), 2);
        assert_eq!(areas[0].priority, 1);
        assert_eq!(areas[1].priority, 2);
        assert!(areas[0].area.contains("quantum computing"));
    }

    #[test]
    fn fallback_snippet_truncates_to_500_chars() {
        let content = "word ".repeat(200);
        let snippet = fallback_snippet(&content);
        assert!(snippet.chars().count() <= 500);
    }

    #[test]
    fn fallback_summary_mentions_source_count_and_areas() {
        let areas = vec![FocusArea::new("historical crop yields".to_string(), 1, "q".to_string())];
        let summary = fallback_summary(&areas, 3);
        assert!(summary.contains('3'));
        assert!(summary.contains("historical crop yields"));
    }
}
