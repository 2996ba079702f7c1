//! Identifier splitting and domain term clustering — spec §4.5.

use std::collections::{BTreeMap, BTreeSet};

const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    ("http", &["http", "https", "url", "uri", "request", "response", "header"]),
    ("auth", &["auth", "token", "session", "login", "credential", "oauth"]),
    ("db", &["db", "sql", "query", "table", "row", "schema", "transaction"]),
    ("cache", &["cache", "evict", "ttl", "lru"]),
    ("io", &["read", "write", "file", "stream", "buffer", "disk"]),
    ("concurrency", &["thread", "lock", "mutex", "channel", "worker", "async", "await"]),
    ("error", &["error", "fail", "panic", "recover", "retry"]),
    ("search", &["search", "index", "query", "match", "rank", "score"]),
    ("config", &["config", "setting", "option", "flag", "env"]),
    ("test", &["test", "mock", "fixture", "assert", "stub"]),
    ("ui", &["render", "view", "widget", "layout", "style"]),
    ("net", &["socket", "tcp", "udp", "connection", "listen", "bind"]),
];

const MAX_CLUSTER_TERMS: usize = 20;
const MAX_KEY_TERMS: usize = 50;
const MAX_DOMAINS: usize = 12;

/// Splits an identifier on camelCase, acronym, and underscore boundaries.
/// `parseHTTPResponse` -> `[parse, http, response]`; `URLParam` ->
/// `[url, param]`. Tokens shorter than 3 characters are dropped by callers,
/// not here, so single-letter loop variables can still be inspected if
/// needed.
pub fn split_identifier(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let starts_new_word = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next.is_some_and(|n| n.is_lowercase()));
            if starts_new_word {
                tokens.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens.into_iter().map(|t| t.to_lowercase()).collect()
}

#[derive(Debug, Default, Clone)]
pub struct TermClusters {
    /// domain -> matched tokens, capped at `MAX_CLUSTER_TERMS` per domain.
    pub clusters: BTreeMap<String, Vec<String>>,
    /// Most frequent tokens across every identifier, capped at `MAX_KEY_TERMS`.
    pub key_terms: Vec<(String, usize)>,
}

/// Splits every identifier, classifies tokens against the domain keyword
/// table, and ranks the most frequent tokens overall.
pub fn cluster_terms(identifiers: &[String]) -> TermClusters {
    let mut frequency: BTreeMap<String, usize> = BTreeMap::new();
    let mut clusters: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for identifier in identifiers {
        for token in split_identifier(identifier) {
            if token.len() < 3 {
                continue;
            }
            *frequency.entry(token.clone()).or_default() += 1;

            for (domain, keywords) in DOMAIN_KEYWORDS {
                if keywords.contains(&token.as_str()) {
                    clusters.entry(domain.to_string()).or_default().insert(token.clone());
                }
            }
        }
    }

    let mut key_terms: Vec<(String, usize)> = frequency.into_iter().collect();
    key_terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    key_terms.truncate(MAX_KEY_TERMS);

    let mut out_clusters: BTreeMap<String, Vec<String>> = clusters
        .into_iter()
        .take(MAX_DOMAINS)
        .map(|(domain, tokens)| {
            let mut tokens: Vec<String> = tokens.into_iter().collect();
            tokens.truncate(MAX_CLUSTER_TERMS);
            (domain, tokens)
        })
        .collect();
    out_clusters.retain(|_, tokens| !tokens.is_empty());

    TermClusters {
        clusters: out_clusters,
        key_terms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_camel_case_acronyms_and_underscores() {
        assert_eq!(split_identifier("parseHTTPResponse"), vec!["parse", "http", "response"]);
        assert_eq!(split_identifier("URLParam"), vec!["url", "param"]);
        assert_eq!(split_identifier("max_file_size"), vec!["max", "file", "size"]);
    }

    #[test]
    fn clusters_identifiers_into_domain_buckets() {
        let ids = vec![
            "HttpRequestHandler".to_string(),
            "parse_http_header".to_string(),
            "renderWidget".to_string(),
        ];
        let clusters = cluster_terms(&ids);
        assert!(clusters.clusters.contains_key("http"));
        assert!(clusters.clusters.contains_key("ui"));
        assert!(!clusters.key_terms.is_empty());
    }

    #[test]
    fn cluster_size_is_capped() {
        let ids: Vec<String> = (0..100).map(|i| format!("httpCall{i}")).collect();
        let clusters = cluster_terms(&ids);
        if let Some(http) = clusters.clusters.get("http") {
            assert!(http.len() <= 20);
        }
        assert!(clusters.key_terms.len() <= 50);
    }
}
