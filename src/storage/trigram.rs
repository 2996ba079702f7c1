//! Trigram merger pipeline — spec §3 (TrigramIndex), §4.2, §5.
//!
//! Each file's postings are built in isolation, batched, and merged into
//! the shared index by a worker pool; per-file postings are append-only
//! until a file is replaced, so a merge never observes a half-written
//! batch (spec §5's "shared resources" guarantee). Posting shape follows
//! `kotadb-kota-db`'s `TrigramIndex` (trigram -> postings), adapted to key
//! postings by `(FileId, byte offset)` instead of document id.

use crate::types::FileId;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Posting {
    pub file: FileId,
    pub offset: u32,
}

pub struct TrigramIndex {
    postings: DashMap<[u8; 3], BTreeSet<Posting>>,
    /// Per-file trigram set, so replacing a file can remove exactly its
    /// own postings without rescanning every gram in the index.
    by_file: DashMap<FileId, Vec<[u8; 3]>>,
    /// Count of merge jobs sent but not yet applied, for `wait_until_drained`.
    pending: Mutex<usize>,
    drained: Condvar,
}

struct MergeJob {
    file: FileId,
    grams: Vec<([u8; 3], u32)>,
}

enum WorkerMsg {
    Job(MergeJob),
    Shutdown,
}

pub struct MergeHandle {
    tx: crossbeam_channel::Sender<WorkerMsg>,
    workers: Vec<std::thread::JoinHandle<()>>,
}

impl TrigramIndex {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            postings: DashMap::new(),
            by_file: DashMap::new(),
            pending: Mutex::new(0),
            drained: Condvar::new(),
        })
    }

    /// Extracts trigrams for a file's content. Byte-oriented: every
    /// 3-byte ASCII-safe window becomes one gram, which is sufficient for
    /// identifier and literal substring search over source code.
    pub fn grams_for(content: &str) -> Vec<([u8; 3], u32)> {
        let bytes = content.as_bytes();
        if bytes.len() < 3 {
            return Vec::new();
        }
        (0..=bytes.len() - 3)
            .map(|offset| {
                let mut gram = [0u8; 3];
                gram.copy_from_slice(&bytes[offset..offset + 3]);
                (gram, offset as u32)
            })
            .collect()
    }

    /// Spawn `worker_count` merge workers sharing one job queue.
    pub fn spawn_mergers(self: &Arc<Self>, worker_count: usize) -> MergeHandle {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<WorkerMsg>();
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count.max(1) {
            let index = Arc::clone(self);
            let rx = job_rx.clone();
            workers.push(std::thread::spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        WorkerMsg::Job(job) => {
                            index.merge_job(job);
                            let mut pending = index.pending.lock();
                            *pending -= 1;
                            if *pending == 0 {
                                index.drained.notify_all();
                            }
                        }
                        WorkerMsg::Shutdown => break,
                    }
                }
            }));
        }
        MergeHandle { tx: job_tx, workers }
    }

    pub fn index_file_via(&self, handle: &MergeHandle, file: FileId, content: &str) {
        let grams = Self::grams_for(content);
        *self.pending.lock() += 1;
        let _ = handle.tx.send(WorkerMsg::Job(MergeJob { file, grams }));
    }

    /// Blocks until every merge job sent via `index_file_via` so far has
    /// been applied to `postings`/`by_file`.
    pub fn wait_until_drained(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.drained.wait(&mut pending);
        }
    }

    fn merge_job(&self, job: MergeJob) {
        self.remove_file(job.file);
        let mut grams_seen = Vec::with_capacity(job.grams.len());
        for (gram, offset) in job.grams {
            self.postings.entry(gram).or_default().insert(Posting {
                file: job.file,
                offset,
            });
            grams_seen.push(gram);
        }
        self.by_file.insert(job.file, grams_seen);
    }

    pub fn remove_file(&self, file: FileId) {
        if let Some((_, grams)) = self.by_file.remove(&file) {
            for gram in grams {
                if let Some(mut set) = self.postings.get_mut(&gram) {
                    set.retain(|p| p.file != file);
                }
            }
        }
    }

    /// Candidate files containing `needle` as a literal substring, via
    /// intersection of the needle's trigram postings. Needles shorter
    /// than 3 bytes fall back to returning every indexed file (the caller
    /// filters precisely afterward).
    pub fn candidates_for(&self, needle: &str) -> BTreeSet<FileId> {
        let grams = Self::grams_for(needle);
        if grams.is_empty() {
            return self.by_file.iter().map(|e| *e.key()).collect();
        }
        let mut sets = grams
            .iter()
            .map(|(gram, _)| {
                self.postings
                    .get(gram)
                    .map(|p| p.iter().map(|post| post.file).collect::<BTreeSet<_>>())
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();
        sets.sort_by_key(|s| s.len());
        let mut iter = sets.into_iter();
        let Some(first) = iter.next() else {
            return BTreeSet::new();
        };
        iter.fold(first, |acc, set| acc.intersection(&set).copied().collect())
    }

    pub fn indexed_file_count(&self) -> usize {
        self.by_file.len()
    }
}

impl MergeHandle {
    /// Explicit quiescence operation: send shutdown, join every worker.
    pub fn shutdown(self) {
        for _ in &self.workers {
            let _ = self.tx.send(WorkerMsg::Shutdown);
        }
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(v: u32) -> FileId {
        FileId::new(v).unwrap()
    }

    #[test]
    fn grams_for_short_strings_is_empty() {
        assert!(TrigramIndex::grams_for("ab").is_empty());
        assert_eq!(TrigramIndex::grams_for("abc").len(), 1);
        assert_eq!(TrigramIndex::grams_for("abcd").len(), 2);
    }

    #[test]
    fn candidates_intersect_across_files() {
        let index = TrigramIndex::new();
        let handle = index.spawn_mergers(1);
        index.index_file_via(&handle, fid(1), "fn process_payment() {}");
        index.index_file_via(&handle, fid(2), "fn process_order() {}");
        index.index_file_via(&handle, fid(3), "fn render_page() {}");
        index.wait_until_drained();

        let hits = index.candidates_for("process_");
        assert!(hits.contains(&fid(1)));
        assert!(hits.contains(&fid(2)));
        assert!(!hits.contains(&fid(3)));

        handle.shutdown();
    }

    #[test]
    fn removing_a_file_drops_its_postings() {
        let index = TrigramIndex::new();
        let handle = index.spawn_mergers(1);
        index.index_file_via(&handle, fid(1), "unique_token_here");
        index.wait_until_drained();
        assert!(index.candidates_for("unique_token").contains(&fid(1)));

        index.remove_file(fid(1));
        assert!(!index.candidates_for("unique_token").contains(&fid(1)));
        assert_eq!(index.indexed_file_count(), 0);

        handle.shutdown();
    }

    #[test]
    fn reindexing_a_file_replaces_its_old_postings() {
        let index = TrigramIndex::new();
        let handle = index.spawn_mergers(1);
        index.index_file_via(&handle, fid(1), "alpha_token");
        index.wait_until_drained();
        assert!(index.candidates_for("alpha_to").contains(&fid(1)));

        index.index_file_via(&handle, fid(1), "beta_token");
        index.wait_until_drained();
        assert!(!index.candidates_for("alpha_to").contains(&fid(1)));
        assert!(index.candidates_for("beta_tok").contains(&fid(1)));

        handle.shutdown();
    }
}
