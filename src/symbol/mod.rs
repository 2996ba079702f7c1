//! Symbol and EnhancedSymbol — spec §3.

use crate::types::{
    CompactString, FileId, FunctionFlags, Range, SymbolId, SymbolKind, VariableFlags,
    compact_string,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single reference slice entry: the edge plus the symbol it points at,
/// resolved for display without a second tracker lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSlot {
    pub symbol_id: SymbolId,
    pub name: CompactString,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedSymbol {
    pub id: SymbolId,
    pub name: CompactString,
    pub kind: SymbolKind,
    pub file_id: FileId,
    pub range: Range,
    pub signature: Option<Box<str>>,
    pub doc_comment: Option<Box<str>>,
    pub cyclomatic_complexity: u32,
    pub parameter_count: u16,
    pub receiver_type: Option<Box<str>>,
    pub exported: bool,
    pub annotations: BTreeSet<CompactString>,
    pub function_flags: FunctionFlags,
    pub variable_flags: VariableFlags,
    /// Ordered list of enclosing named scopes, outermost first.
    pub scope_chain: Vec<CompactString>,
    /// Populated by the reference tracker after the symbol is inserted;
    /// empty for a freshly parsed symbol.
    pub incoming: Vec<ReferenceSlot>,
    pub outgoing: Vec<ReferenceSlot>,
}

impl EnhancedSymbol {
    pub fn new(
        id: SymbolId,
        name: impl Into<CompactString>,
        kind: SymbolKind,
        file_id: FileId,
        range: Range,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            file_id,
            range,
            signature: None,
            doc_comment: None,
            cyclomatic_complexity: 1,
            parameter_count: 0,
            receiver_type: None,
            exported: false,
            annotations: BTreeSet::new(),
            function_flags: FunctionFlags::empty(),
            variable_flags: VariableFlags::empty(),
            scope_chain: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<Box<str>>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_complexity(mut self, complexity: u32) -> Self {
        self.cyclomatic_complexity = complexity;
        self
    }

    pub fn with_doc_comment(mut self, doc: impl Into<Box<str>>) -> Self {
        self.doc_comment = Some(doc.into());
        self
    }

    pub fn exported(mut self, exported: bool) -> Self {
        self.exported = exported;
        self
    }

    /// Importance score used by the search engine (spec §4.4): reference
    /// count weighted higher than raw calls, boosted for exported and
    /// program-entry-shaped names.
    pub fn importance_score(&self) -> f32 {
        let mut score =
            (self.incoming.len() as f32) * 10.0 + (self.outgoing.len() as f32) * 5.0;
        if self.exported {
            score += 20.0;
            score *= 1.5;
        }
        let lower = self.name.to_lowercase();
        if lower == "main" || lower.ends_with("_main") {
            score *= 2.0;
        } else if lower.contains("handler") || lower.contains("controller") || lower.contains("service")
        {
            score *= 1.3;
        }
        score
    }

    pub fn complexity_bucket(&self) -> ComplexityBucket {
        match self.cyclomatic_complexity {
            0..=10 => ComplexityBucket::Simple,
            11..=15 => ComplexityBucket::Moderate,
            16..=20 => ComplexityBucket::High,
            _ => ComplexityBucket::VeryHigh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplexityBucket {
    Simple,
    Moderate,
    High,
    VeryHigh,
}

pub fn compact(s: &str) -> CompactString {
    compact_string(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym() -> EnhancedSymbol {
        EnhancedSymbol::new(
            SymbolId::new(1).unwrap(),
            "process",
            SymbolKind::Method,
            FileId::new(1).unwrap(),
            Range::new(1, 0, 3, 1),
        )
    }

    #[test]
    fn builder_methods_set_fields() {
        let s = sym().with_signature("fn process(&self)").with_complexity(4);
        assert_eq!(s.signature.as_deref(), Some("fn process(&self)"));
        assert_eq!(s.cyclomatic_complexity, 4);
    }

    #[test]
    fn importance_boosts_exported_and_main_like_names() {
        let mut plain = sym();
        plain.name = compact("helper");
        let plain_score = plain.importance_score();

        let mut main_like = sym();
        main_like.name = compact("main");
        main_like.exported = true;
        assert!(main_like.importance_score() > plain_score);
    }

    #[test]
    fn complexity_bucket_thresholds_match_spec() {
        let mut s = sym();
        s.cyclomatic_complexity = 10;
        assert_eq!(s.complexity_bucket(), ComplexityBucket::Simple);
        s.cyclomatic_complexity = 15;
        assert_eq!(s.complexity_bucket(), ComplexityBucket::Moderate);
        s.cyclomatic_complexity = 20;
        assert_eq!(s.complexity_bucket(), ComplexityBucket::High);
        s.cyclomatic_complexity = 21;
        assert_eq!(s.complexity_bucket(), ComplexityBucket::VeryHigh);
    }
}
