//! Auto-index manager — spec §4.1. Drives the initial build, exposes a
//! broadcast readiness latch instead of a poll, and debounces watcher
//! events for incremental re-indexing.

use crate::config::Settings;
use crate::error::{ToolError, ToolResult};
use crate::indexing::file_info::{FileRecord, Language};
use crate::indexing::master_index::{MasterIndex, PendingEdge};
use crate::indexing::walker::FileWalker;
use crate::parsing::parser_for;
use crate::storage::reference_tracker::RelationKind;
use crate::types::{FileCounter, SymbolCounter};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Idle,
    Scanning,
    Indexing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexProgress {
    pub is_scanning: bool,
    pub total_files: usize,
    pub files_processed: usize,
    pub scanning_progress: u8,
    pub indexing_progress: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOp {
    Created,
    Modified,
    Removed,
}

pub struct AutoIndexManager {
    state: RwLock<IndexState>,
    latch_tx: watch::Sender<bool>,
    latch_rx: watch::Receiver<bool>,
    total_files: AtomicUsize,
    files_processed: AtomicUsize,
    /// Paths touched by a watcher event, keyed to the instant of their most
    /// recent event — a path is only applied once it's been stable past
    /// `coalesce_window` (spec §4.1's debouncing requirement).
    pending_changes: Mutex<HashMap<PathBuf, Instant>>,
    coalesce_window: Duration,
}

impl AutoIndexManager {
    pub fn new(debounce_ms: u64) -> Self {
        let (latch_tx, latch_rx) = watch::channel(false);
        Self {
            state: RwLock::new(IndexState::Idle),
            latch_tx,
            latch_rx,
            total_files: AtomicUsize::new(0),
            files_processed: AtomicUsize::new(0),
            pending_changes: Mutex::new(HashMap::new()),
            coalesce_window: Duration::from_millis(debounce_ms),
        }
    }

    pub fn state(&self) -> IndexState {
        *self.state.read()
    }

    /// Spec §4.2's readiness gate: a sentinel "indexing in progress" error
    /// until the manager parks in `completed` or `idle`.
    pub fn check_indexing_complete(&self) -> ToolResult<()> {
        match self.state() {
            IndexState::Completed | IndexState::Idle => Ok(()),
            _ => Err(ToolError::NotReady {
                index_stats_hint: true,
            }),
        }
    }

    pub fn progress(&self) -> IndexProgress {
        let total = self.total_files.load(Ordering::Relaxed);
        let processed = self.files_processed.load(Ordering::Relaxed);
        let is_scanning = self.state() == IndexState::Scanning;
        let indexing_progress = if total == 0 {
            100
        } else {
            ((processed as f64 / total as f64) * 100.0).min(100.0) as u8
        };
        IndexProgress {
            is_scanning,
            total_files: total,
            files_processed: processed,
            scanning_progress: if is_scanning { 0 } else { 100 },
            indexing_progress,
        }
    }

    /// Walks `root`, parses every candidate file in parallel, and hands
    /// each result to `index` under its own write discipline. Per-file
    /// parse failures are recorded as warnings and never abort the build;
    /// only a failure to read the root itself does.
    pub fn start(&self, root: &Path, settings: &Settings, index: &MasterIndex) -> ToolResult<Vec<String>> {
        *self.state.write() = IndexState::Scanning;
        let walker = FileWalker::new(settings);
        let (files, _stats) = walker.walk(root);
        self.total_files.store(files.len(), Ordering::Relaxed);
        self.files_processed.store(0, Ordering::Relaxed);

        if files.is_empty() {
            *self.state.write() = IndexState::Idle;
            let _ = self.latch_tx.send(true);
            return Ok(Vec::new());
        }

        *self.state.write() = IndexState::Indexing;
        let file_counter = FileCounter::new();
        let symbol_counter = SymbolCounter::new();
        let warnings = Mutex::new(Vec::new());

        files.par_iter().for_each(|path| {
            match index_one_file(path, &file_counter, &symbol_counter) {
                Ok((record, content, edges)) => {
                    index.add_file(record, &content, edges);
                }
                Err(reason) => {
                    warnings.lock().push(format!("{}: {reason}", path.display()));
                }
            }
            self.files_processed.fetch_add(1, Ordering::Relaxed);
        });

        index.wait_until_quiescent();
        *self.state.write() = IndexState::Completed;
        let _ = self.latch_tx.send(true);
        Ok(warnings.into_inner())
    }

    /// Blocks (asynchronously) until the completion latch fires or
    /// `timeout` elapses. The latch is a broadcast condition, not polled.
    pub async fn wait_for_completion(&self, timeout: Duration) -> ToolResult<IndexState> {
        let mut rx = self.latch_rx.clone();
        if *rx.borrow() {
            return Ok(self.state());
        }
        match tokio::time::timeout(timeout, rx.changed()).await {
            Ok(Ok(())) => Ok(self.state()),
            Ok(Err(_)) => Err(ToolError::InternalPanic {
                message: "completion latch sender dropped".to_string(),
            }),
            Err(_) => Err(ToolError::Timeout {
                what: "index readiness",
                elapsed_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Records a watcher event against the debounce timer; does not
    /// re-index immediately. Call `flush_ready` on a timer to apply
    /// coalesced changes.
    pub fn watcher_event(&self, path: PathBuf, op: WatchOp) {
        let mut pending = self.pending_changes.lock();
        match op {
            WatchOp::Removed => pending.remove(&path),
            WatchOp::Created | WatchOp::Modified => pending.insert(path, Instant::now()),
        };
    }

    /// Drains every path that has been stable past `coalesce_window`,
    /// leaving paths still being actively edited in `pending_changes`.
    fn take_stable_paths(&self) -> Vec<PathBuf> {
        let mut pending = self.pending_changes.lock();
        let now = Instant::now();
        let mut ready = Vec::new();
        pending.retain(|path, last_event| {
            if now.duration_since(*last_event) >= self.coalesce_window {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });
        ready
    }

    /// Applies every path that has been stable past the debounce window:
    /// re-parse, diff by content hash, and replace (or remove, if the file
    /// no longer exists) in `index`.
    pub fn flush_ready(&self, index: &MasterIndex) -> Vec<String> {
        let ready = self.take_stable_paths();
        let file_counter = FileCounter::new();
        let symbol_counter = SymbolCounter::new();
        let mut warnings = Vec::new();

        for path in ready {
            let path_str = path.to_string_lossy().into_owned();
            let existing_id = index.find_file_id_by_path(&path_str);
            if !path.exists() {
                if let Some(file_id) = existing_id {
                    index.remove_file(file_id);
                }
                continue;
            }
            let file_id = existing_id.unwrap_or_else(|| file_counter.next());
            match index_one_file_as(&path, file_id, &symbol_counter) {
                Ok((record, content, edges)) => index.replace_file(record, &content, edges),
                Err(reason) => warnings.push(format!("{}: {reason}", path.display())),
            }
        }
        index.wait_until_quiescent();
        warnings
    }
}

fn index_one_file(
    path: &Path,
    file_counter: &FileCounter,
    symbol_counter: &SymbolCounter,
) -> Result<(FileRecord, String, Vec<PendingEdge>), String> {
    index_one_file_as(path, file_counter.next(), symbol_counter)
}

/// Parses `path` under a caller-chosen `FileId` — re-indexing an existing
/// file must keep its original id so cross-references and opaque ids
/// issued to clients before the edit stay meaningful for the file itself.
fn index_one_file_as(
    path: &Path,
    file_id: crate::types::FileId,
    symbol_counter: &SymbolCounter,
) -> Result<(FileRecord, String, Vec<PendingEdge>), String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| "no file extension".to_string())?;
    let language = Language::from_extension(extension).ok_or_else(|| format!("unsupported extension .{extension}"))?;

    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let mut parser = parser_for(language)?;

    let symbols = parser.parse(&content, file_id, symbol_counter);
    let imports = parser.find_imports(&content);
    let perf = parser.extract_perf_data(&content);

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let content_hash: [u8; 32] = hasher.finalize().into();

    let mut edges = Vec::new();
    for (caller_name, callee_name, range) in parser.find_calls(&content) {
        let callee = symbols.iter().find(|s| s.name.as_ref() == callee_name);
        let caller = symbols
            .iter()
            .find(|s| s.name.as_ref() == caller_name)
            .or_else(|| symbols.first());
        if let (Some(caller), Some(callee)) = (caller, callee) {
            if caller.id != callee.id {
                edges.push(PendingEdge {
                    source: caller.id,
                    target: callee.id,
                    kind: RelationKind::Call,
                    line: range.start_line,
                    column: range.start_column,
                });
            }
        }
    }

    let record = FileRecord {
        id: file_id,
        path: path.to_string_lossy().into_owned().into(),
        language,
        imports,
        symbols,
        perf: Some(perf).filter(|p| !p.is_empty()),
        content_hash,
    };

    Ok((record, content, edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn empty_directory_completes_as_idle_without_stalling() {
        let dir = tempdir().unwrap();
        let settings = Settings::default();
        let index = MasterIndex::new(1, 1024 * 1024);
        let manager = AutoIndexManager::new(0);

        manager.start(dir.path(), &settings, &index).unwrap();
        let state = manager
            .wait_for_completion(Duration::from_secs(5))
            .await
            .expect("empty root completes promptly");
        assert!(matches!(state, IndexState::Idle));
        assert!(manager.check_indexing_complete().is_ok());
        index.shutdown();
    }

    #[tokio::test]
    async fn build_over_one_file_reaches_completed_with_symbols() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("service.rs"),
            "struct Service;\n\nimpl Service {\n    pub fn process(&self) {}\n}\n\nfn main() {\n    let s = Service;\n    s.process();\n}\n",
        )
        .unwrap();

        let settings = Settings::default();
        let index = MasterIndex::new(1, 1024 * 1024);
        let manager = AutoIndexManager::new(0);

        manager.start(dir.path(), &settings, &index).unwrap();
        let state = manager.wait_for_completion(Duration::from_secs(5)).await.unwrap();
        assert!(matches!(state, IndexState::Completed));
        assert_eq!(index.get_file_count(), 1);
        assert!(index.get_symbol_count() >= 3);
        index.shutdown();
    }

    #[tokio::test]
    async fn wait_for_completion_times_out_before_start_is_called() {
        let manager = AutoIndexManager::new(0);
        let result = manager.wait_for_completion(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(ToolError::Timeout { .. })));
    }

    #[test]
    fn stable_paths_become_ready_after_the_debounce_window() {
        let manager = AutoIndexManager::new(20);
        manager.watcher_event(PathBuf::from("service.rs"), WatchOp::Modified);
        assert!(manager.take_stable_paths().is_empty(), "too soon after the event");

        std::thread::sleep(Duration::from_millis(30));
        let ready = manager.take_stable_paths();
        assert_eq!(ready, vec![PathBuf::from("service.rs")]);
        assert!(manager.take_stable_paths().is_empty(), "already drained");
    }

    #[test]
    fn repeated_edits_reset_the_timer() {
        let manager = AutoIndexManager::new(30);
        manager.watcher_event(PathBuf::from("service.rs"), WatchOp::Modified);
        std::thread::sleep(Duration::from_millis(20));
        manager.watcher_event(PathBuf::from("service.rs"), WatchOp::Modified);
        std::thread::sleep(Duration::from_millis(20));
        assert!(manager.take_stable_paths().is_empty(), "reset by the second edit");

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(manager.take_stable_paths(), vec![PathBuf::from("service.rs")]);
    }

    #[test]
    fn removed_events_drop_a_pending_path() {
        let manager = AutoIndexManager::new(0);
        manager.watcher_event(PathBuf::from("service.rs"), WatchOp::Created);
        manager.watcher_event(PathBuf::from("service.rs"), WatchOp::Removed);
        assert!(manager.take_stable_paths().is_empty());
    }
}
