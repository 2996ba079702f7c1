//! Size-capped file-content cache with background update workers (spec §3,
//! §4.2, §5's "known leak class").
//!
//! Content is read once by a parser worker and handed here so later tools
//! (e.g. `search --output context`) don't re-read the file from disk. The
//! cache is capped in total bytes; inserts past the cap evict the oldest
//! entry by insertion order, tracked with an `IndexMap` the way the
//! teacher's config module relies on `indexmap` for stable ordering
//! elsewhere.

use crate::types::FileId;
use indexmap::IndexMap;
use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct ContentStore {
    entries: RwLock<IndexMap<FileId, Arc<str>>>,
    total_bytes: AtomicUsize,
    cap_bytes: usize,
    tx: crossbeam_channel::Sender<ContentUpdate>,
    rx: crossbeam_channel::Receiver<ContentUpdate>,
    /// Count of updates sent but not yet applied, for `wait_until_drained`.
    pending: Mutex<usize>,
    drained: Condvar,
}

enum ContentUpdate {
    Put(FileId, Arc<str>),
    Remove(FileId),
    Shutdown,
}

impl ContentStore {
    pub fn new(cap_bytes: usize) -> Arc<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        Arc::new(Self {
            entries: RwLock::new(IndexMap::new()),
            total_bytes: AtomicUsize::new(0),
            cap_bytes,
            tx,
            rx,
            pending: Mutex::new(0),
            drained: Condvar::new(),
        })
    }

    /// Spawn the background writer. Returns a join handle the caller keeps
    /// so `shutdown` can actually wait for the worker to drain — the
    /// teacher's watcher workers are documented as lacking this, spec §5
    /// calls it out as a known issue this implementation must close.
    pub fn spawn_writer(self: &Arc<Self>) -> std::thread::JoinHandle<()> {
        let store = Arc::clone(self);
        std::thread::spawn(move || {
            while let Ok(update) = store.rx.recv() {
                let applied = match update {
                    ContentUpdate::Put(id, content) => {
                        store.apply_put(id, content);
                        true
                    }
                    ContentUpdate::Remove(id) => {
                        store.apply_remove(id);
                        true
                    }
                    ContentUpdate::Shutdown => break,
                };
                if applied {
                    let mut pending = store.pending.lock();
                    *pending -= 1;
                    if *pending == 0 {
                        store.drained.notify_all();
                    }
                }
            }
        })
    }

    pub fn put(&self, id: FileId, content: Arc<str>) {
        *self.pending.lock() += 1;
        let _ = self.tx.send(ContentUpdate::Put(id, content));
    }

    pub fn remove(&self, id: FileId) {
        *self.pending.lock() += 1;
        let _ = self.tx.send(ContentUpdate::Remove(id));
    }

    /// Blocks until every `put`/`remove` sent so far has been applied.
    pub fn wait_until_drained(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.drained.wait(&mut pending);
        }
    }

    /// Sends the shutdown marker and joins the worker: close -> latch ->
    /// join, the drain protocol spec §9 requires implementers to pin down.
    pub fn shutdown(self: &Arc<Self>, handle: std::thread::JoinHandle<()>) {
        let _ = self.tx.send(ContentUpdate::Shutdown);
        let _ = handle.join();
    }

    pub fn get(&self, id: FileId) -> Option<Arc<str>> {
        self.entries.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply_put(&self, id: FileId, content: Arc<str>) {
        let size = content.len();
        let mut entries = self.entries.write();
        if let Some(old) = entries.insert(id, content) {
            self.total_bytes.fetch_sub(old.len(), Ordering::Relaxed);
        }
        self.total_bytes.fetch_add(size, Ordering::Relaxed);

        while self.total_bytes.load(Ordering::Relaxed) > self.cap_bytes && !entries.is_empty() {
            if let Some((_, evicted)) = entries.shift_remove_index(0) {
                self.total_bytes.fetch_sub(evicted.len(), Ordering::Relaxed);
            } else {
                break;
            }
        }
    }

    fn apply_remove(&self, id: FileId) {
        if let Some(removed) = self.entries.write().shift_remove(&id) {
            self.total_bytes.fetch_sub(removed.len(), Ordering::Relaxed);
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
    fn put_and_get_round_trip() {
        let store = ContentStore::new(1024);
        let handle = store.spawn_writer();
        store.put(fid(1), Arc::from("fn main() {}"));
        store.wait_until_drained();
        assert_eq!(store.get(fid(1)).as_deref(), Some("fn main() {}"));
        store.shutdown(handle);
    }

    #[test]
    fn eviction_respects_byte_cap() {
        let store = ContentStore::new(10);
        let handle = store.spawn_writer();
        store.put(fid(1), Arc::from("0123456789"));
        store.wait_until_drained();
        assert!(store.get(fid(1)).is_some());

        store.put(fid(2), Arc::from("abcdefghij"));
        store.wait_until_drained();
        assert!(store.get(fid(2)).is_some());
        assert!(store.get(fid(1)).is_none(), "oldest entry should be evicted once over cap");
        store.shutdown(handle);
    }

    #[test]
    fn remove_clears_entry() {
        let store = ContentStore::new(1024);
        let handle = store.spawn_writer();
        store.put(fid(1), Arc::from("content"));
        store.wait_until_drained();
        store.remove(fid(1));
        store.wait_until_drained();
        assert!(store.get(fid(1)).is_none());
        store.shutdown(handle);
    }
}
