//! Side-effect / purity classification — heuristic, name-based, in the
//! same spirit as `terms::DOMAIN_KEYWORDS` and `memory_pressure`'s
//! allocation-name heuristic: a symbol is impure if any call inside its
//! range targets a callee whose name matches a known effectful category.
//! This is not effect inference; it is pattern matching over call names,
//! same as the rest of this module's heuristics.

use crate::indexing::file_info::FileRecord;
use crate::symbol::EnhancedSymbol;
use crate::types::SymbolId;

const EFFECT_CATEGORIES: &[(&str, &[&str])] = &[
    ("io", &["read", "write", "open", "close", "flush", "print", "fs::"]),
    ("network", &["connect", "send", "recv", "fetch", "request", "socket", "http"]),
    ("concurrency", &["lock", "spawn", "join", "notify", "signal"]),
    ("time_random", &["now", "random", "rand", "uuid"]),
    ("mutation", &["push", "insert", "remove", "delete", "update", "clear", "set_"]),
    ("process", &["exit", "env::", "command", "exec"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purity {
    Pure,
    Impure { categories: Vec<&'static str> },
}

fn categories_for(callee_name: &str) -> Vec<&'static str> {
    let lower = callee_name.to_lowercase();
    EFFECT_CATEGORIES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(category, _)| *category)
        .collect()
}

pub fn classify(file: &FileRecord, symbol: &EnhancedSymbol) -> Purity {
    let Some(perf) = &file.perf else { return Purity::Pure };

    let mut categories: Vec<&'static str> = Vec::new();
    for call in &perf.calls {
        if symbol.range.contains(call.range.start_line, call.range.start_column) {
            for category in categories_for(&call.callee_name) {
                if !categories.contains(&category) {
                    categories.push(category);
                }
            }
        }
    }

    if categories.is_empty() {
        Purity::Pure
    } else {
        Purity::Impure { categories }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolPurity {
    pub symbol_id: SymbolId,
    pub name: Box<str>,
    pub purity: Purity,
}

pub fn classify_file(file: &FileRecord) -> Vec<SymbolPurity> {
    file.symbols
        .iter()
        .map(|symbol| SymbolPurity {
            symbol_id: symbol.id,
            name: symbol.name.clone(),
            purity: classify(file, symbol),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PuritySummary {
    pub pure: usize,
    pub impure: usize,
}

pub fn summarize(results: &[SymbolPurity]) -> PuritySummary {
    let mut summary = PuritySummary::default();
    for r in results {
        match &r.purity {
            Purity::Pure => summary.pure += 1,
            Purity::Impure { .. } => summary.impure += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::file_info::{CallSite, Language, PerfData};
    use crate::types::{FileId, Range, SymbolCounter, SymbolKind};

    fn file_with_call(callee: &str, symbol_range: Range, call_range: Range) -> (FileRecord, EnhancedSymbol) {
        let counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();
        let symbol = EnhancedSymbol::new(counter.next(), "handler", SymbolKind::Function, file_id, symbol_range);
        let perf = PerfData {
            loops: Vec::new(),
            awaits: Vec::new(),
            calls: vec![CallSite { callee_name: callee.into(), range: call_range, loop_depth: 0, allocates: false }],
        };
        let file = FileRecord {
            id: file_id,
            path: "handler.rs".into(),
            language: Language::Rust,
            imports: Vec::new(),
            symbols: vec![symbol.clone()],
            perf: Some(perf),
            content_hash: [0u8; 32],
        };
        (file, symbol)
    }

    #[test]
    fn network_call_marks_symbol_impure_with_category() {
        let (file, symbol) = file_with_call("http_client.send", Range::new(0, 0, 5, 0), Range::new(2, 0, 2, 5));
        match classify(&file, &symbol) {
            Purity::Impure { categories } => assert!(categories.contains(&"network")),
            Purity::Pure => panic!("expected impure"),
        }
    }

    #[test]
    fn symbol_with_no_perf_data_is_pure() {
        let counter = SymbolCounter::new();
        let file_id = FileId::new(1).unwrap();
        let symbol = EnhancedSymbol::new(counter.next(), "add", SymbolKind::Function, file_id, Range::new(0, 0, 1, 0));
        let file = FileRecord {
            id: file_id,
            path: "math.rs".into(),
            language: Language::Rust,
            imports: Vec::new(),
            symbols: vec![symbol.clone()],
            perf: None,
            content_hash: [0u8; 32],
        };
        assert_eq!(classify(&file, &symbol), Purity::Pure);
    }
}
