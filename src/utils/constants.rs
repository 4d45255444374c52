//! Shared default values referenced across components (§6.1).

/// Neutral referer spoofed on scrape requests (§4.5 step 4).
pub const NEUTRAL_REFERER: &str = "https://www.google.com/";
