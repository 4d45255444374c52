//! HTML content selection and sanitization (§4.5 steps 6, 8).

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

const MAX_CONTENT_BYTES: usize = 500 * 1024;
const MAX_LINE_CHARS: usize = 2000;
const TRUNCATION_NOTICE: &str = "\n\n[content truncated]";

static REMOVE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, nav, header, footer, iframe, noscript")
        .expect("static selector is valid")
});

/// Content containers tried in priority order (§4.5 step 6), longest match
/// wins among those that are present.
static CONTENT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article",
        "[role=main]",
        ".main-content",
        "#main-content",
        ".post-content",
        ".article-content",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("static selector is valid"))
    .collect()
});

static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("static selector is valid"));

/// Select and extract the main textual content of a page, with
/// script/style/nav/etc. removed first by only walking text nodes outside
/// those subtrees (`scraper`/`ego-tree` gives us read access to the parsed
/// tree; we filter by skipping descendants of removed elements rather than
/// mutating the tree).
#[must_use]
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let removed: std::collections::HashSet<ego_tree::NodeId> = document
        .select(&REMOVE_SELECTOR)
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect();

    let mut candidates: Vec<String> = CONTENT_SELECTORS
        .iter()
        .flat_map(|selector| document.select(selector))
        .map(|el| text_excluding(&el, &removed))
        .collect();

    candidates.sort_by_key(|b| std::cmp::Reverse(b.len()));

    if let Some(longest) = candidates.into_iter().find(|s| !s.trim().is_empty()) {
        return longest;
    }

    document
        .select(&BODY_SELECTOR)
        .next()
        .map(|el| text_excluding(&el, &removed))
        .unwrap_or_default()
}

fn text_excluding(el: &scraper::ElementRef, removed: &std::collections::HashSet<ego_tree::NodeId>) -> String {
    el.descendants()
        .filter(|node| !removed.contains(&node.id()))
        .filter_map(|node| node.value().as_text())
        .map(|text| text.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sanitize extracted text (§4.5 step 8): drop NULs, collapse whitespace
/// runs, drop non-printable characters (keeping `\n`/`\t`), normalize line
/// endings, drop overlong lines, cap total size.
#[must_use]
pub fn sanitize(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let cleaned: String = normalized
        .chars()
        .filter(|c| *c != '\0')
        .filter(|c| *c == '\n' || *c == '\t' || !c.is_control())
        .collect();

    let collapsed = collapse_whitespace_runs(&cleaned);

    let mut lines: Vec<&str> = Vec::new();
    for line in collapsed.lines() {
        if line.chars().count() <= MAX_LINE_CHARS {
            lines.push(line);
        }
    }
    let joined = lines.join("\n");

    cap_size(&joined)
}

fn collapse_whitespace_runs(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_space = false;
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            if !prev_was_space {
                result.push(' ');
            }
            prev_was_space = true;
        } else {
            result.push(c);
            prev_was_space = false;
        }
    }
    result
}

fn cap_size(text: &str) -> String {
    if text.len() <= MAX_CONTENT_BYTES {
        return text.to_string();
    }

    let budget = MAX_CONTENT_BYTES.saturating_sub(TRUNCATION_NOTICE.len());
    let cut_at = text
        .char_indices()
        .take_while(|(idx, _)| *idx < budget)
        .last()
        .map(|(idx, c)| idx + c.len_utf8())
        .unwrap_or(0);

    format!("{}{}", &text[..cut_at], TRUNCATION_NOTICE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_article_over_body() {
        let html = "<html><body><nav>nav text</nav><article>Main article text</article></body></html>";
        let text = extract_main_text(html);
        assert!(text.contains("Main article text"));
        assert!(!text.contains("nav text"));
    }

    #[test]
    fn falls_back_to_body_when_no_containers_present() {
        let html = "<html><body><p>Just a plain page</p></body></html>";
        let text = extract_main_text(html);
        assert!(text.contains("Just a plain page"));
    }

    #[test]
    fn sanitize_drops_nuls_and_collapses_whitespace() {
        let input = "hello\0   world\t\tagain";
        let result = sanitize(input);
        assert!(!result.contains('\0'));
        assert!(!result.contains("   "));
    }

    #[test]
    fn sanitize_caps_total_size_and_appends_notice() {
        let huge = "a".repeat(MAX_CONTENT_BYTES + 1000);
        let result = sanitize(&huge);
        assert!(result.len() <= MAX_CONTENT_BYTES);
        assert!(result.ends_with(TRUNCATION_NOTICE));
    }

    #[test]
    fn sanitize_drops_overlong_lines() {
        let long_line = "x".repeat(MAX_LINE_CHARS + 1);
        let input = format!("short line\n{long_line}\nanother short line");
        let result = sanitize(&input);
        assert!(result.contains("short line"));
        assert!(!result.contains(&long_line));
    }
}
