//! Match scoring — spec §4.4: exact-match weight, symbol importance, and
//! Jaro-Winkler fuzzy similarity, combined into one ranking score.

use crate::analysis::split_identifier;
use crate::symbol::EnhancedSymbol;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;
const EXACT_MATCH_WEIGHT: f32 = 100.0;
const PREFIX_SCALING: f64 = 0.1;
const MAX_PREFIX: usize = 4;

/// Jaro similarity followed by the Winkler common-prefix boost.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    let jaro = jaro_similarity(a, b);
    if jaro <= 0.0 {
        return jaro;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let prefix = a_chars
        .iter()
        .zip(b_chars.iter())
        .take(MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();
    jaro + prefix as f64 * PREFIX_SCALING * (1.0 - jaro)
}

fn jaro_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let match_distance = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matches = vec![false; a.len()];
    let mut b_matches = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, &ac) in a.iter().enumerate() {
        let lo = i.saturating_sub(match_distance);
        let hi = (i + match_distance + 1).min(b.len());
        for j in lo..hi {
            if b_matches[j] || b[j] != ac {
                continue;
            }
            a_matches[i] = true;
            b_matches[j] = true;
            matches += 1;
            break;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut k = 0usize;
    for (i, &matched) in a_matches.iter().enumerate() {
        if !matched {
            continue;
        }
        while !b_matches[k] {
            k += 1;
        }
        if a[i] != b[k] {
            transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    (m / a.len() as f64 + m / b.len() as f64 + (m - transpositions as f64 / 2.0) / m) / 3.0
}

/// Porter2-subset stemmer: strips the handful of English suffixes common
/// in identifiers (`-ing`, `-ed`, `-s`, `-es`, `-ies`) on tokens of at
/// least 3 characters. Not a full Porter2 implementation — identifiers are
/// short and rarely need step 2/3 rewrites.
pub fn stem(token: &str) -> String {
    if token.len() < 3 {
        return token.to_string();
    }
    let lower = token.to_lowercase();
    if let Some(stripped) = lower.strip_suffix("ies") {
        if stripped.len() >= 2 {
            return format!("{stripped}y");
        }
    }
    if let Some(stripped) = lower.strip_suffix("ing") {
        if stripped.len() >= 3 {
            return stripped.to_string();
        }
    }
    if let Some(stripped) = lower.strip_suffix("ed") {
        if stripped.len() >= 3 {
            return stripped.to_string();
        }
    }
    if let Some(stripped) = lower.strip_suffix("es") {
        if stripped.len() >= 3 {
            return stripped.to_string();
        }
    }
    if let Some(stripped) = lower.strip_suffix('s') {
        if !lower.ends_with("ss") && stripped.len() >= 3 {
            return stripped.to_string();
        }
    }
    lower
}

/// Combines exact-match weight, symbol importance, and (when `semantic`)
/// fuzzy similarity into one score. Returns `None` when the pattern does
/// not match at all (fuzzy score below threshold and no exact/substring
/// hit) so candidates can be dropped rather than ranked at zero.
pub fn score_symbol(symbol: &EnhancedSymbol, pattern: &str, case_insensitive: bool, semantic: bool) -> Option<f32> {
    let name = symbol.name.as_ref();
    let (haystack, needle) = if case_insensitive {
        (name.to_lowercase(), pattern.to_lowercase())
    } else {
        (name.to_string(), pattern.to_string())
    };

    let mut score = symbol.importance_score();
    let mut matched = false;

    if haystack == needle {
        score += EXACT_MATCH_WEIGHT;
        matched = true;
    } else if haystack.contains(&needle) {
        score += EXACT_MATCH_WEIGHT * 0.5;
        matched = true;
    }

    if semantic && !matched {
        let fuzzy = jaro_winkler(&haystack, &needle);
        if fuzzy >= DEFAULT_FUZZY_THRESHOLD {
            score += (fuzzy * EXACT_MATCH_WEIGHT as f64 * 0.3) as f32;
            matched = true;
        } else if stem(&haystack) == stem(&needle) {
            score += EXACT_MATCH_WEIGHT * 0.2;
            matched = true;
        } else if name_split_synonym_match(name, &needle) {
            score += EXACT_MATCH_WEIGHT * 0.15;
            matched = true;
        }
    }

    matched.then_some(score)
}

/// A `semantic` search treats a query token as matching any camel/acronym/
/// underscore-split part of the symbol's name, stemmed — catches queries
/// like `signin` against `SignInHandler` via its `sign`/`in`/`handler`
/// parts even when fuzzy similarity alone falls short.
fn name_split_synonym_match(name: &str, needle: &str) -> bool {
    let needle_stem = stem(needle);
    split_identifier(name).iter().any(|part| stem(part) == needle_stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileId, Range, SymbolId, SymbolKind};

    #[test]
    fn identical_strings_have_similarity_one() {
        assert!((jaro_winkler("martha", "martha") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn transposed_strings_score_below_one_but_above_zero() {
        let s = jaro_winkler("martha", "marhta");
        assert!(s > 0.9 && s < 1.0);
    }

    #[test]
    fn stem_drops_common_suffixes() {
        assert_eq!(stem("running"), "runn" /* run+n is fine for a coarse stemmer */);
        assert_eq!(stem("cached"), "cach");
        assert_eq!(stem("handlers"), "handler");
        assert_eq!(stem("ok"), "ok");
    }

    fn sym(name: &str, exported: bool) -> EnhancedSymbol {
        EnhancedSymbol::new(SymbolId::new(1).unwrap(), name, SymbolKind::Function, FileId::new(1).unwrap(), Range::new(0, 0, 1, 0))
            .exported(exported)
    }

    #[test]
    fn fuzzy_finds_sign_in_handler_for_signin_query() {
        let symbol = sym("SignInHandler", true);
        let score = score_symbol(&symbol, "signin", true, true);
        assert!(score.is_some());
        assert!(score.unwrap() > 0.0);
    }

    #[test]
    fn non_matching_pattern_without_semantic_returns_none() {
        let symbol = sym("ParseConfig", false);
        assert!(score_symbol(&symbol, "zzz", true, false).is_none());
    }
}
