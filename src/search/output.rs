//! LCF output shaping for search results — spec §4.4, §4.7. Truncation
//! contract: never cut inside a multi-byte character, prefer the nearest
//! earlier word boundary within the last ~8 chars of budget, always end
//! truncated text with `...`.

use crate::search::engine::{HitRole, SearchResults};
use crate::search::params::OutputMode;
use crate::types::opaque_id;

const SINGLE_LINE_BUDGET: usize = 100;
const CONTEXT_BUDGET: usize = 300;
const FULL_BUDGET: usize = 500;
const CONTEXT_LINES_CAP: usize = 10;
const FULL_LINES_CAP: usize = 30;
const FULL_TOTAL_CONTEXT_BYTES: usize = 2048;
const WORD_BOUNDARY_WINDOW: usize = 8;

/// Truncates `text` to at most `budget` bytes, respecting char boundaries
/// and preferring a word boundary near the cut point.
pub fn truncate(text: &str, budget: usize) -> String {
    if text.len() <= budget {
        return text.to_string();
    }
    let ellipsis_room = budget.saturating_sub(3);
    let mut cut = ellipsis_room.min(text.len());
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }

    let window_start = cut.saturating_sub(WORD_BOUNDARY_WINDOW);
    if let Some(space_idx) = text[window_start..cut].rfind(char::is_whitespace) {
        cut = window_start + space_idx;
    }

    format!("{}...", &text[..cut])
}

fn context_budget_for(mode: OutputMode) -> Option<(usize, usize)> {
    match mode {
        OutputMode::SingleLine => Some((SINGLE_LINE_BUDGET, 0)),
        OutputMode::Context => Some((CONTEXT_BUDGET, CONTEXT_LINES_CAP)),
        OutputMode::Full => Some((FULL_BUDGET, FULL_LINES_CAP)),
        OutputMode::Files | OutputMode::FilesWithMatches | OutputMode::Count => None,
    }
}

/// Renders search results into LCF text. `source_of` resolves a file path
/// to its full content so context lines can be pulled out; results shaped
/// for `count`/`files`/`files_with_matches` never call it.
pub fn render(mode: OutputMode, results: &SearchResults, source_of: impl Fn(&str) -> Option<String>) -> String {
    match mode {
        OutputMode::Count => format!("LCF/1.0 mode=count\ntotal={} files={}\n", results.total, results.files),
        OutputMode::Files | OutputMode::FilesWithMatches => {
            let mut out = format!("LCF/1.0 mode={}\ntotal={} files={}\n", mode_name(mode), results.total, results.files);
            let mut seen = std::collections::BTreeSet::new();
            for hit in &results.hits {
                if seen.insert(hit.file_path.clone()) {
                    out.push_str(&hit.file_path);
                    out.push('\n');
                }
            }
            out
        }
        OutputMode::SingleLine | OutputMode::Context | OutputMode::Full => {
            let (match_budget, line_cap) = context_budget_for(mode).unwrap();
            let mut out = format!("LCF/1.0 mode={}\ntotal={} files={}\n", mode_name(mode), results.total, results.files);
            let mut total_context_bytes = 0usize;

            for hit in &results.hits {
                let id = opaque_id::encode(hit.symbol.id.value());
                let role = if hit.role == HitRole::Declaration { 1 } else { 0 };
                let text = truncate(hit.symbol.name.as_ref(), match_budget);
                out.push_str(&format!(
                    "{}:{}:{} o={} s={:.1} t={} n={} e={} {}\n",
                    hit.file_path,
                    hit.line,
                    hit.column,
                    id,
                    hit.score,
                    hit.symbol.kind.as_str(),
                    hit.symbol.name,
                    role,
                    text
                ));

                if line_cap == 0 || total_context_bytes >= FULL_TOTAL_CONTEXT_BYTES {
                    continue;
                }
                if let Some(source) = source_of(&hit.file_path) {
                    let start = hit.line.saturating_sub(1) as usize;
                    for line in source.lines().skip(start).take(line_cap) {
                        if total_context_bytes >= FULL_TOTAL_CONTEXT_BYTES {
                            break;
                        }
                        let remaining = FULL_TOTAL_CONTEXT_BYTES - total_context_bytes;
                        let shown = truncate(line, match_budget.min(remaining));
                        total_context_bytes += shown.len();
                        out.push_str("> ");
                        out.push_str(&shown);
                        out.push('\n');
                    }
                }
            }
            out
        }
    }
}

fn mode_name(mode: OutputMode) -> &'static str {
    match mode {
        OutputMode::SingleLine => "single-line",
        OutputMode::Context => "context",
        OutputMode::Full => "full",
        OutputMode::Files => "files",
        OutputMode::FilesWithMatches => "files_with_matches",
        OutputMode::Count => "count",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_text_is_unchanged() {
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn truncate_never_splits_a_multibyte_char() {
        let text = "a".repeat(10) + "é" + &"b".repeat(10);
        let truncated = truncate(&text, 12);
        assert!(truncated.is_char_boundary(truncated.len() - 3));
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn truncate_prefers_word_boundary_near_cut() {
        let text = "the quick brown fox jumps over the lazy dog and keeps running";
        let truncated = truncate(text, 20);
        assert!(truncated.ends_with("..."));
        assert!(!truncated[..truncated.len() - 3].ends_with(char::is_alphanumeric) || truncated.len() <= 20);
    }

    #[test]
    fn count_mode_emits_exact_two_line_shape() {
        let results = SearchResults { hits: Vec::new(), total: 3, files: 1 };
        let out = render(OutputMode::Count, &results, |_| None);
        assert_eq!(out, "LCF/1.0 mode=count\ntotal=3 files=1\n");
    }
}
