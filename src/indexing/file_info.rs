//! File record and parser-emitted performance metadata (spec §3, §4.5).

use crate::symbol::EnhancedSymbol;
use crate::types::{FileId, Range};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    pub path: Box<str>,
    pub alias: Option<Box<str>>,
    pub is_glob: bool,
}

/// A loop the parser found, with its nesting depth (0 = top-level loop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSite {
    pub range: Range,
    pub depth: u16,
}

/// An `await` expression site. `sequential_group` lets the anti-pattern
/// detector cluster awaits that share no data dependency: the parser
/// assigns the same group id to awaits it found back-to-back in the same
/// block with no intervening use of a prior await's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitSite {
    pub range: Range,
    pub sequential_group: u32,
}

/// A call site, annotated with the loop depth it occurs at (0 = not in a
/// loop) so the memory-pressure propagator can weight allocation-shaped
/// calls by how often they run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub callee_name: Box<str>,
    pub range: Range,
    pub loop_depth: u16,
    pub allocates: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfData {
    pub loops: Vec<LoopSite>,
    pub awaits: Vec<AwaitSite>,
    pub calls: Vec<CallSite>,
}

impl PerfData {
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty() && self.awaits.is_empty() && self.calls.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Python,
    JavaScript,
}

impl Language {
    pub fn from_extension(ext: &str) -> Option<Self> {
        Some(match ext {
            "rs" => Self::Rust,
            "py" | "pyi" => Self::Python,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub path: Box<str>,
    pub language: Language,
    pub imports: Vec<Import>,
    /// Ordered by (line, column) — source order, per spec §5.
    pub symbols: Vec<EnhancedSymbol>,
    pub perf: Option<PerfData>,
    pub content_hash: [u8; 32],
}

impl FileRecord {
    pub fn is_entry_candidate(&self, symbol: &EnhancedSymbol) -> bool {
        if symbol.name.as_ref() == "main" {
            return true;
        }
        symbol.exported
            && matches!(
                symbol.kind,
                crate::types::SymbolKind::Function | crate::types::SymbolKind::Method
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_resolves_from_extension() {
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("jsx"), Some(Language::JavaScript));
        assert_eq!(Language::from_extension("kt"), None);
    }

    #[test]
    fn perf_data_empty_when_no_sites() {
        assert!(PerfData::default().is_empty());
    }
}
