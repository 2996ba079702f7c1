//! Memory-pressure propagation — spec §4.5, grounded on the teacher's
//! `topology.rs` PageRank implementation (iterative, damping factor,
//! convergence threshold) but propagated over the call graph instead of
//! the import graph, seeded from parser-reported allocation sites.

use crate::indexing::MasterIndex;
use crate::types::SymbolId;
use std::collections::HashMap;

const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 50;
const CONVERGENCE_THRESHOLD: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy)]
pub struct PressureScore {
    pub symbol: SymbolId,
    pub score: f64,
    pub severity: Severity,
}

/// Per-symbol direct score: sum of `(loop_depth + 1)` over every
/// allocation-shaped call site whose range falls inside the symbol.
fn direct_scores(index: &MasterIndex) -> HashMap<SymbolId, f64> {
    let mut scores = HashMap::new();
    for file in index.get_all_files() {
        let Some(perf) = &file.perf else { continue };
        for symbol in &file.symbols {
            let mut total = 0.0;
            for call in &perf.calls {
                if call.allocates && symbol.range.contains(call.range.start_line, call.range.start_column) {
                    total += call.loop_depth as f64 + 1.0;
                }
            }
            if total > 0.0 {
                scores.insert(symbol.id, total);
            }
        }
    }
    scores
}

/// Propagates direct allocation pressure through the call graph. When
/// `direct_only` is set (tracker/graph considered unavailable), skips
/// propagation and scores every symbol by its direct allocation weight
/// alone.
pub fn propagate(index: &MasterIndex, direct_only: bool) -> Vec<PressureScore> {
    let direct = direct_scores(index);
    let all_symbols: Vec<SymbolId> = index
        .get_all_files()
        .into_iter()
        .flat_map(|f| f.symbols.into_iter().map(|s| s.id))
        .collect();

    let mut scores: HashMap<SymbolId, f64> = all_symbols
        .iter()
        .map(|id| (*id, direct.get(id).copied().unwrap_or(0.0)))
        .collect();

    if !direct_only {
        for _ in 0..MAX_ITERATIONS {
            let mut new_scores = HashMap::with_capacity(all_symbols.len());
            let mut max_diff: f64 = 0.0;

            for &id in &all_symbols {
                let direct_v = direct.get(&id).copied().unwrap_or(0.0);
                let callers = index.tracker().called_by(id);
                let mut sum = 0.0;
                for caller in &callers {
                    let callee_count = index.tracker().calls_to(*caller).len().max(1);
                    let caller_score = scores.get(caller).copied().unwrap_or(0.0);
                    sum += caller_score / callee_count as f64;
                }
                let new_score = DAMPING * direct_v + (1.0 - DAMPING) * sum;
                max_diff = max_diff.max((new_score - scores.get(&id).copied().unwrap_or(0.0)).abs());
                new_scores.insert(id, new_score);
            }

            scores = new_scores;
            if max_diff < CONVERGENCE_THRESHOLD {
                break;
            }
        }
    }

    bucket_by_percentile(scores)
}

fn bucket_by_percentile(scores: HashMap<SymbolId, f64>) -> Vec<PressureScore> {
    let mut ranked: Vec<(SymbolId, f64)> = scores.into_iter().filter(|(_, s)| *s > 0.0).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let total = ranked.len().max(1);

    ranked
        .into_iter()
        .enumerate()
        .map(|(rank, (symbol, score))| {
            let percentile = 100.0 - (rank as f64 / total as f64) * 100.0;
            let severity = if percentile >= 90.0 {
                Severity::Critical
            } else if percentile >= 70.0 {
                Severity::High
            } else if percentile >= 40.0 {
                Severity::Medium
            } else {
                Severity::Low
            };
            PressureScore { symbol, score, severity }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::file_info::{CallSite, FileRecord, Language, PerfData};
    use crate::symbol::EnhancedSymbol;
    use crate::types::{FileId, Range, SymbolCounter, SymbolKind};

    #[test]
    fn symbol_with_allocation_in_a_loop_scores_higher_than_one_without() {
        let index = MasterIndex::new(1, 1024 * 1024);
        let counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();

        let hot = EnhancedSymbol::new(counter.next(), "hot", SymbolKind::Function, file_id, Range::new(0, 0, 5, 0));
        let cold = EnhancedSymbol::new(counter.next(), "cold", SymbolKind::Function, file_id, Range::new(6, 0, 10, 0));

        let perf = PerfData {
            loops: Vec::new(),
            awaits: Vec::new(),
            calls: vec![CallSite {
                callee_name: "Vec::new".into(),
                range: Range::new(2, 0, 2, 10),
                loop_depth: 3,
                allocates: true,
            }],
        };

        let record = FileRecord {
            id: file_id,
            path: "hot.rs".into(),
            language: Language::Rust,
            imports: Vec::new(),
            symbols: vec![hot.clone(), cold.clone()],
            perf: Some(perf),
            content_hash: [0u8; 32],
        };
        index.add_file(record, "content", Vec::new());

        let scores = propagate(&index, true);
        let hot_score = scores.iter().find(|s| s.symbol == hot.id).unwrap();
        assert!(scores.iter().find(|s| s.symbol == cold.id).is_none());
        assert!(hot_score.score > 0.0);
        assert_eq!(hot_score.severity, Severity::Critical);
        index.shutdown();
    }

    #[test]
    fn empty_index_yields_no_scores() {
        let index = MasterIndex::new(1, 1024);
        assert!(propagate(&index, false).is_empty());
        index.shutdown();
    }
}
