//! `robots.txt` evaluation (§4.2).
//!
//! No example in this codebase's lineage ships a `robots.txt` parser, so
//! this one is hand-rolled: a line-oriented reader matching the informal
//! subset of the standard actually used in practice (`User-agent`,
//! `Disallow`, `Allow`, longest-match-wins), tolerant of malformed input
//! per the default-allow contract below.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reqwest::Client;

use crate::utils::host_of;

/// One host's parsed `robots.txt`, or the "allow everything" default used
/// when the fetch failed or the file was malformed.
#[derive(Debug, Clone, Default)]
struct HostPolicy {
    /// Rules per user-agent group, most specific group wins; `"*"` is the
    /// wildcard group. Each rule is `(path_prefix, allow)`.
    groups: HashMap<String, Vec<(String, bool)>>,
}

impl HostPolicy {
    fn parse(body: &str) -> Self {
        let mut groups: HashMap<String, Vec<(String, bool)>> = HashMap::new();
        let mut current_agents: Vec<String> = Vec::new();
        let mut rules_seen_since_agent = false;

        for raw_line in body.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    let agent = value.to_ascii_lowercase();
                    // Consecutive User-agent lines with no rules between
                    // them belong to the same group; a rule line closes
                    // the running group, so the next User-agent starts one.
                    if rules_seen_since_agent {
                        current_agents.clear();
                        rules_seen_since_agent = false;
                    }
                    current_agents.push(agent.clone());
                    groups.entry(agent).or_default();
                }
                "disallow" if !value.is_empty() => {
                    rules_seen_since_agent = true;
                    for agent in &current_agents {
                        groups.entry(agent.clone()).or_default().push((value.to_string(), false));
                    }
                }
                "disallow" => {
                    // Empty Disallow means "allow everything" for this agent.
                    rules_seen_since_agent = true;
                }
                "allow" => {
                    rules_seen_since_agent = true;
                    for agent in &current_agents {
                        groups.entry(agent.clone()).or_default().push((value.to_string(), true));
                    }
                }
                _ => {}
            }
        }

        Self { groups }
    }

    fn is_allowed(&self, path: &str, user_agent: &str) -> bool {
        let ua = user_agent.to_ascii_lowercase();
        let matched_agent = self
            .groups
            .keys()
            .filter(|agent| agent.as_str() != "*" && ua.contains(agent.as_str()))
            .max_by_key(|agent| agent.len())
            .cloned();

        let group = matched_agent
            .as_deref()
            .or(Some("*"))
            .and_then(|agent| self.groups.get(agent));

        let Some(rules) = group else {
            return true;
        };

        let mut best: Option<(&str, bool)> = None;
        for (prefix, allow) in rules {
            if path.starts_with(prefix.as_str())
                && best.is_none_or(|(best_prefix, _)| prefix.len() > best_prefix.len())
            {
                best = Some((prefix.as_str(), *allow));
            }
        }
        best.map_or(true, |(_, allow)| allow)
    }
}

/// Fetches, parses and caches `robots.txt` for the process lifetime.
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    client: Client,
    timeout: Duration,
    cache: Arc<DashMap<String, HostPolicy>>,
}

impl RobotsPolicy {
    #[must_use]
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Whether `url` may be fetched by `user_agent`. On any failure to
    /// fetch or parse `robots.txt`, defaults to allow (§4.2).
    pub async fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return true;
        };
        let Some(host) = host_of(url) else {
            return true;
        };

        if let Some(policy) = self.cache.get(&host) {
            return policy.is_allowed(parsed.path(), user_agent);
        }

        let policy = self.fetch_policy(&parsed).await;
        let allowed = policy.is_allowed(parsed.path(), user_agent);
        self.cache.insert(host, policy);
        allowed
    }

    async fn fetch_policy(&self, url: &url::Url) -> HostPolicy {
        let robots_url = format!(
            "{}://{}/robots.txt",
            url.scheme(),
            url.host_str().unwrap_or_default()
        );

        let fetch = async {
            let response = self.client.get(&robots_url).send().await.ok()?;
            if !response.status().is_success() {
                return None;
            }
            response.text().await.ok()
        };

        match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Some(body)) => {
                log::debug!("fetched robots.txt for {robots_url}");
                HostPolicy::parse(&body)
            }
            Ok(None) => {
                log::debug!("no robots.txt at {robots_url}, defaulting to allow-all");
                HostPolicy::default()
            }
            Err(_) => {
                log::debug!("robots.txt fetch timed out for {robots_url}, defaulting to allow-all");
                HostPolicy::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_robots_allows_everything() {
        let policy = HostPolicy::default();
        assert!(policy.is_allowed("/anything", "research-bot"));
    }

    #[test]
    fn disallow_blocks_matching_prefix() {
        let policy = HostPolicy::parse("User-agent: *\nDisallow: /private\n");
        assert!(!policy.is_allowed("/private/page", "research-bot"));
        assert!(policy.is_allowed("/public/page", "research-bot"));
    }

    #[test]
    fn more_specific_allow_overrides_disallow() {
        let policy = HostPolicy::parse("User-agent: *\nDisallow: /private\nAllow: /private/public\n");
        assert!(policy.is_allowed("/private/public/page", "research-bot"));
        assert!(!policy.is_allowed("/private/secret", "research-bot"));
    }

    #[test]
    fn malformed_file_defaults_to_allow() {
        let policy = HostPolicy::parse("this is not a robots file at all\n12345\n");
        assert!(policy.is_allowed("/whatever", "research-bot"));
    }

    #[test]
    fn empty_disallow_value_allows_all() {
        let policy = HostPolicy::parse("User-agent: *\nDisallow:\n");
        assert!(policy.is_allowed("/anything", "research-bot"));
    }
}
