//! Master index — spec §4.2. Owns the file table, symbol table, reference
//! tracker, trigram index, content store and entry-point set; exposes a
//! narrow write API and a broad read API over them.

use crate::error::{ToolError, ToolResult};
use crate::indexing::file_info::{FileRecord, Language};
use crate::storage::{ContentStore, EntryPointSet, ReferenceTracker, RelationshipStats};
use crate::storage::reference_tracker::{Edge, RelationKind};
use crate::storage::trigram::{MergeHandle, TrigramIndex};
use crate::symbol::EnhancedSymbol;
use crate::types::{FileId, SymbolId, SymbolKind};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// One pending cross-reference the caller discovered while parsing a file,
/// resolved to symbol ids once both endpoints are known to the index.
pub struct PendingEdge {
    pub source: SymbolId,
    pub target: SymbolId,
    pub kind: RelationKind,
    pub line: u32,
    pub column: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct TypeCount {
    pub kind: SymbolKind,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct IndexStats {
    pub file_count: usize,
    pub symbol_count: usize,
    pub trigram_file_count: usize,
    pub content_cached_files: usize,
    pub relationships: RelationshipStats,
}

/// Owns every storage component for one project. Writers serialize through
/// `write_lock` (spec §4.2's single-writer discipline); `DashMap` still
/// gives readers lock-free access to unrelated keys while a write is in
/// flight.
pub struct MasterIndex {
    files: DashMap<FileId, FileRecord>,
    symbol_location: DashMap<SymbolId, FileId>,
    name_index: DashMap<Box<str>, Vec<SymbolId>>,
    tracker: ReferenceTracker,
    trigrams: Arc<TrigramIndex>,
    trigram_merge: MergeHandle,
    content: Arc<ContentStore>,
    content_writer: Option<std::thread::JoinHandle<()>>,
    entry_points: EntryPointSet,
    write_lock: Mutex<()>,
}

impl MasterIndex {
    pub fn new(trigram_workers: usize, content_cap_bytes: usize) -> Self {
        let trigrams = TrigramIndex::new();
        let trigram_merge = trigrams.spawn_mergers(trigram_workers.max(1));
        let content = ContentStore::new(content_cap_bytes);
        let content_writer = Some(content.spawn_writer());
        Self {
            files: DashMap::new(),
            symbol_location: DashMap::new(),
            name_index: DashMap::new(),
            tracker: ReferenceTracker::new(),
            trigrams,
            trigram_merge,
            content,
            content_writer,
            entry_points: EntryPointSet::new(),
            write_lock: Mutex::new(()),
        }
    }

    fn index_file_content(&self, file_id: FileId, content: &str) {
        self.content.put(file_id, Arc::from(content));
        self.trigrams.index_file_via(&self.trigram_merge, file_id, content);
    }

    fn deregister_name(&self, name: &str, id: SymbolId) {
        if let Some(mut ids) = self.name_index.get_mut(name) {
            ids.retain(|sid| *sid != id);
        }
    }

    /// Adds a new file with its already-parsed symbols. `content` is the
    /// raw source text, fed to the content store and trigram index.
    /// `edges` are resolved `(source, target)` symbol pairs discovered for
    /// this file (e.g. call sites whose callee was already in the index).
    pub fn add_file(&self, record: FileRecord, content: &str, edges: Vec<PendingEdge>) {
        let _guard = self.write_lock.lock();
        self.add_file_locked(record, content, edges);
    }

    fn add_file_locked(&self, record: FileRecord, content: &str, edges: Vec<PendingEdge>) {
        let file_id = record.id;

        for symbol in &record.symbols {
            self.symbol_location.insert(symbol.id, file_id);
            self.name_index
                .entry(symbol.name.to_lowercase().into())
                .or_default()
                .push(symbol.id);
            self.tracker.register_file_symbol(file_id, symbol.id);
            if record.is_entry_candidate(symbol) {
                self.entry_points.insert(file_id, symbol.id);
            }
        }

        for edge in edges {
            self.tracker.add_edge(Edge {
                source: edge.source,
                target: edge.target,
                source_file: file_id,
                kind: edge.kind,
                line: edge.line,
                column: edge.column,
            });
        }

        self.index_file_content(file_id, content);
        self.files.insert(file_id, record);
    }

    pub fn remove_file(&self, file_id: FileId) {
        let _guard = self.write_lock.lock();
        self.remove_file_locked(file_id);
    }

    fn remove_file_locked(&self, file_id: FileId) {
        let Some((_, record)) = self.files.remove(&file_id) else {
            return;
        };
        for symbol in &record.symbols {
            self.symbol_location.remove(&symbol.id);
            self.deregister_name(&symbol.name.to_lowercase(), symbol.id);
        }
        self.tracker.remove_file(file_id);
        self.trigrams.remove_file(file_id);
        self.content.remove(file_id);
        self.entry_points.remove_file(file_id);
    }

    /// Atomic from a reader's perspective: removal and insertion happen
    /// under one `write_lock` acquisition, so no reader can observe a
    /// window where the old record is gone and the new one isn't in yet
    /// (spec §3 invariant 2, §4.2).
    pub fn replace_file(&self, record: FileRecord, content: &str, edges: Vec<PendingEdge>) {
        let _guard = self.write_lock.lock();
        let file_id = record.id;
        if let Some(existing) = self.files.get(&file_id) {
            if existing.content_hash == record.content_hash {
                return;
            }
        }
        self.remove_file_locked(file_id);
        self.add_file_locked(record, content, edges);
    }

    pub fn get_file(&self, file_id: FileId) -> Option<FileRecord> {
        self.files.get(&file_id).map(|r| r.clone())
    }

    pub fn get_file_enhanced_symbols(&self, file_id: FileId) -> Vec<EnhancedSymbol> {
        self.files
            .get(&file_id)
            .map(|r| r.symbols.clone())
            .unwrap_or_default()
    }

    pub fn find_symbols_by_name(&self, name: &str) -> Vec<EnhancedSymbol> {
        let key = name.to_lowercase();
        let Some(ids) = self.name_index.get(key.as_str()) else {
            return Vec::new();
        };
        ids.iter().filter_map(|id| self.get_symbol_by_id(*id)).collect()
    }

    pub fn get_symbol_by_id(&self, id: SymbolId) -> Option<EnhancedSymbol> {
        let file_id = *self.symbol_location.get(&id)?;
        let record = self.files.get(&file_id)?;
        record.symbols.iter().find(|s| s.id == id).cloned()
    }

    pub fn get_all_files(&self) -> Vec<FileRecord> {
        self.files.iter().map(|e| e.value().clone()).collect()
    }

    pub fn find_file_id_by_path(&self, path: &str) -> Option<FileId> {
        self.files
            .iter()
            .find(|e| e.value().path.as_ref() == path)
            .map(|e| *e.key())
    }

    pub fn get_all_file_ids_filtered(&self, language: Option<Language>) -> Vec<FileId> {
        self.files
            .iter()
            .filter(|e| language.is_none_or(|l| e.value().language == l))
            .map(|e| *e.key())
            .collect()
    }

    pub fn get_entry_points(&self) -> Vec<SymbolId> {
        self.entry_points.all()
    }

    pub fn get_type_distribution(&self) -> Vec<TypeCount> {
        let mut counts: std::collections::HashMap<SymbolKind, usize> = std::collections::HashMap::new();
        for file in self.files.iter() {
            for symbol in &file.symbols {
                *counts.entry(symbol.kind).or_default() += 1;
            }
        }
        let mut out: Vec<TypeCount> = counts
            .into_iter()
            .map(|(kind, count)| TypeCount { kind, count })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count));
        out
    }

    pub fn get_top_symbols(&self, n: usize) -> Vec<EnhancedSymbol> {
        let mut all: Vec<EnhancedSymbol> = self
            .files
            .iter()
            .flat_map(|f| f.symbols.clone())
            .collect();
        all.sort_by(|a, b| {
            b.importance_score()
                .partial_cmp(&a.importance_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        all.truncate(n);
        all
    }

    pub fn get_index_stats(&self) -> IndexStats {
        IndexStats {
            file_count: self.get_file_count(),
            symbol_count: self.get_symbol_count(),
            trigram_file_count: self.trigrams.indexed_file_count(),
            content_cached_files: self.content.len(),
            relationships: self.tracker.relationship_stats(),
        }
    }

    pub fn get_file_count(&self) -> usize {
        self.files.len()
    }

    pub fn get_symbol_count(&self) -> usize {
        self.symbol_location.len()
    }

    pub fn tracker(&self) -> &ReferenceTracker {
        &self.tracker
    }

    pub fn content(&self) -> &Arc<ContentStore> {
        &self.content
    }

    pub fn trigrams(&self) -> &Arc<TrigramIndex> {
        &self.trigrams
    }

    /// Blocks until every content-store write and trigram merge enqueued
    /// so far has actually been applied. An index build or an incremental
    /// re-index must call this before declaring itself complete (spec §3
    /// invariant 6, §5) — without it, a caller can observe `Completed` while
    /// `content()`/`trigrams()` still reflect a prior state.
    pub fn wait_until_quiescent(&self) {
        self.content.wait_until_drained();
        self.trigrams.wait_until_drained();
    }

    /// Explicit close -> latch -> join drain protocol (spec §5, §9).
    pub fn shutdown(mut self) {
        if let Some(handle) = self.content_writer.take() {
            self.content.shutdown(handle);
        }
        self.trigram_merge.shutdown();
    }
}

/// An index with zero files or symbols answers queries as `NotReady`, not
/// `NotFound` (spec §8 scenario 2: an empty directory yields a NotReady
/// envelope, not a timeout or a not-found) — the index is technically
/// done building, but nothing is in it to query yet.
pub fn require_populated(index: &MasterIndex) -> ToolResult<()> {
    if index.get_file_count() == 0 || index.get_symbol_count() == 0 {
        return Err(ToolError::NotReady { index_stats_hint: true });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Range, SymbolCounter};

    fn fid(v: u32) -> FileId {
        FileId::new(v).unwrap()
    }

    fn sample_record(id: FileId, counter: &SymbolCounter) -> FileRecord {
        let service = EnhancedSymbol::new(counter.next(), "Service", SymbolKind::Struct, id, Range::new(0, 0, 0, 10));
        let process = EnhancedSymbol::new(counter.next(), "Process", SymbolKind::Method, id, Range::new(1, 0, 3, 1))
            .exported(true);
        FileRecord {
            id,
            path: "service.rs".into(),
            language: Language::Rust,
            imports: Vec::new(),
            symbols: vec![service, process],
            perf: None,
            content_hash: [0u8; 32],
        }
    }

    #[test]
    fn add_file_populates_every_read_path() {
        let index = MasterIndex::new(1, 1024 * 1024);
        let counter = SymbolCounter::new();
        let record = sample_record(fid(1), &counter);
        index.add_file(record, "struct Service; impl Service { fn Process(&self) {} }", Vec::new());

        assert_eq!(index.get_file_count(), 1);
        assert_eq!(index.get_symbol_count(), 2);
        assert_eq!(index.find_symbols_by_name("process").len(), 1);
        assert!(!index.get_all_files().is_empty());
        index.shutdown();
    }

    #[test]
    fn remove_file_clears_symbols_and_name_index() {
        let index = MasterIndex::new(1, 1024 * 1024);
        let counter = SymbolCounter::new();
        let record = sample_record(fid(1), &counter);
        let removed_id = record.symbols[1].id;
        index.add_file(record, "content", Vec::new());

        index.remove_file(fid(1));
        assert_eq!(index.get_file_count(), 0);
        assert_eq!(index.get_symbol_count(), 0);
        assert!(index.get_symbol_by_id(removed_id).is_none());
        assert!(index.find_symbols_by_name("process").is_empty());
        index.shutdown();
    }

    #[test]
    fn replace_file_with_same_hash_is_a_no_op() {
        let index = MasterIndex::new(1, 1024 * 1024);
        let counter = SymbolCounter::new();
        let record = sample_record(fid(1), &counter);
        index.add_file(record.clone(), "content", Vec::new());
        let before = index.get_symbol_count();

        index.replace_file(record, "content", Vec::new());
        assert_eq!(index.get_symbol_count(), before);
        index.shutdown();
    }

    #[test]
    fn file_count_zero_implies_symbol_count_zero() {
        let index = MasterIndex::new(1, 1024);
        assert_eq!(index.get_file_count(), 0);
        assert_eq!(index.get_symbol_count(), 0);
        assert!(require_populated(&index).is_err());
        index.shutdown();
    }
}
