//! Reference tracker — spec §4.3.
//!
//! Symbols own nothing about their relationships directly; edges live here
//! as integer pairs in separate forward/reverse adjacency maps (spec §9),
//! so a file removal never has to walk live symbol data to find the edges
//! that touch it.

use crate::types::{FileId, SymbolId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Call,
    Reference,
    Implements,
    Extends,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: SymbolId,
    pub target: SymbolId,
    pub source_file: FileId,
    pub kind: RelationKind,
    pub line: u32,
    pub column: u16,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RelationshipStats {
    pub calls: usize,
    pub references: usize,
    pub implements: usize,
    pub extends: usize,
}

/// Forward edges keyed by source symbol, reverse edges keyed by target
/// symbol. Every mutation updates both maps together so neither is ever
/// observed half-applied by a concurrent reader.
#[derive(Debug, Default)]
pub struct ReferenceTracker {
    outgoing: DashMap<SymbolId, Vec<Edge>>,
    incoming: DashMap<SymbolId, Vec<Edge>>,
    /// Symbols declared in each file, so file removal can find every edge
    /// whose source lies in that file without a full scan.
    by_file: DashMap<FileId, Vec<SymbolId>>,
}

impl ReferenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_file_symbol(&self, file: FileId, symbol: SymbolId) {
        self.by_file.entry(file).or_default().push(symbol);
    }

    pub fn add_edge(&self, edge: Edge) {
        self.outgoing.entry(edge.source).or_default().push(edge);
        self.incoming.entry(edge.target).or_default().push(edge);
    }

    /// Remove every edge sourced in `file`, dropping edges whose target no
    /// longer exists is implicit: dangling targets are simply never looked
    /// up again once their owning symbol id is gone from the symbol table.
    pub fn remove_file(&self, file: FileId) {
        let Some((_, symbols)) = self.by_file.remove(&file) else {
            return;
        };
        for symbol in symbols {
            if let Some((_, edges)) = self.outgoing.remove(&symbol) {
                for edge in edges {
                    if let Some(mut reverse) = self.incoming.get_mut(&edge.target) {
                        reverse.retain(|e| e.source != symbol);
                    }
                }
            }
            if let Some((_, edges)) = self.incoming.remove(&symbol) {
                for edge in edges {
                    if let Some(mut forward) = self.outgoing.get_mut(&edge.source) {
                        forward.retain(|e| e.target != symbol);
                    }
                }
            }
        }
    }

    pub fn outgoing_for(&self, id: SymbolId) -> Vec<Edge> {
        self.outgoing.get(&id).map(|v| v.clone()).unwrap_or_default()
    }

    pub fn incoming_for(&self, id: SymbolId) -> Vec<Edge> {
        self.incoming.get(&id).map(|v| v.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, id: SymbolId) -> Vec<SymbolId> {
        self.outgoing_for(id)
            .into_iter()
            .filter(|e| e.kind == RelationKind::Call)
            .map(|e| e.target)
            .collect()
    }

    pub fn called_by(&self, id: SymbolId) -> Vec<SymbolId> {
        self.incoming_for(id)
            .into_iter()
            .filter(|e| e.kind == RelationKind::Call)
            .map(|e| e.source)
            .collect()
    }

    pub fn implementors(&self, trait_id: SymbolId) -> Vec<SymbolId> {
        self.incoming_for(trait_id)
            .into_iter()
            .filter(|e| e.kind == RelationKind::Implements)
            .map(|e| e.source)
            .collect()
    }

    pub fn derived_types(&self, base_id: SymbolId) -> Vec<SymbolId> {
        self.incoming_for(base_id)
            .into_iter()
            .filter(|e| e.kind == RelationKind::Extends)
            .map(|e| e.source)
            .collect()
    }

    pub fn base_types(&self, derived_id: SymbolId) -> Vec<SymbolId> {
        self.outgoing_for(derived_id)
            .into_iter()
            .filter(|e| e.kind == RelationKind::Extends)
            .map(|e| e.target)
            .collect()
    }

    pub fn has_relationships(&self) -> bool {
        !self.outgoing.is_empty()
    }

    pub fn relationship_stats(&self) -> RelationshipStats {
        let mut stats = RelationshipStats::default();
        for entry in self.outgoing.iter() {
            for edge in entry.value() {
                match edge.kind {
                    RelationKind::Call => stats.calls += 1,
                    RelationKind::Reference => stats.references += 1,
                    RelationKind::Implements => stats.implements += 1,
                    RelationKind::Extends => stats.extends += 1,
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(v: u32) -> SymbolId {
        SymbolId::new(v).unwrap()
    }
    fn fid(v: u32) -> FileId {
        FileId::new(v).unwrap()
    }

    fn edge(source: SymbolId, target: SymbolId, kind: RelationKind, file: FileId) -> Edge {
        Edge {
            source,
            target,
            source_file: file,
            kind,
            line: 1,
            column: 0,
        }
    }

    #[test]
    fn incoming_matches_reverse_of_outgoing() {
        let tracker = ReferenceTracker::new();
        let a = sid(1);
        let b = sid(2);
        tracker.register_file_symbol(fid(1), a);
        tracker.add_edge(edge(a, b, RelationKind::Call, fid(1)));

        let incoming = tracker.incoming_for(b);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, a);
        assert_eq!(tracker.called_by(b), vec![a]);
        assert_eq!(tracker.calls_to(a), vec![b]);
    }

    #[test]
    fn removing_a_file_drops_every_edge_touching_its_symbols() {
        let tracker = ReferenceTracker::new();
        let a = sid(1);
        let b = sid(2);
        tracker.register_file_symbol(fid(1), a);
        tracker.add_edge(edge(a, b, RelationKind::Call, fid(1)));

        tracker.remove_file(fid(1));

        assert!(tracker.outgoing_for(a).is_empty());
        assert!(tracker.incoming_for(b).is_empty());
    }

    #[test]
    fn implements_and_extends_resolve_both_directions() {
        let tracker = ReferenceTracker::new();
        let trait_id = sid(1);
        let impl_id = sid(2);
        let base = sid(3);
        let derived = sid(4);
        tracker.add_edge(edge(impl_id, trait_id, RelationKind::Implements, fid(1)));
        tracker.add_edge(edge(derived, base, RelationKind::Extends, fid(1)));

        assert_eq!(tracker.implementors(trait_id), vec![impl_id]);
        assert_eq!(tracker.derived_types(base), vec![derived]);
        assert_eq!(tracker.base_types(derived), vec![base]);
    }

    #[test]
    fn relationship_stats_count_each_kind() {
        let tracker = ReferenceTracker::new();
        tracker.add_edge(edge(sid(1), sid(2), RelationKind::Call, fid(1)));
        tracker.add_edge(edge(sid(1), sid(3), RelationKind::Reference, fid(1)));
        let stats = tracker.relationship_stats();
        assert_eq!(stats.calls, 1);
        assert_eq!(stats.references, 1);
        assert!(tracker.has_relationships());
    }
}
