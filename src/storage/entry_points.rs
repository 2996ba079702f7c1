//! EntryPointSet — spec §3. Precomputed subset of symbols matching `main`,
//! exported top-level functions, and language-specific program entries,
//! indexed by `FileId` for O(1) group access.

use crate::types::{FileId, SymbolId};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct EntryPointSet {
    by_file: DashMap<FileId, Vec<SymbolId>>,
}

impl EntryPointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file: FileId, symbol: SymbolId) {
        self.by_file.entry(file).or_default().push(symbol);
    }

    pub fn remove_file(&self, file: FileId) {
        self.by_file.remove(&file);
    }

    pub fn for_file(&self, file: FileId) -> Vec<SymbolId> {
        self.by_file.get(&file).map(|v| v.clone()).unwrap_or_default()
    }

    pub fn all(&self) -> Vec<SymbolId> {
        self.by_file.iter().flat_map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.by_file.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_access_is_per_file() {
        let set = EntryPointSet::new();
        let f1 = FileId::new(1).unwrap();
        let f2 = FileId::new(2).unwrap();
        set.insert(f1, SymbolId::new(1).unwrap());
        set.insert(f1, SymbolId::new(2).unwrap());
        set.insert(f2, SymbolId::new(3).unwrap());

        assert_eq!(set.for_file(f1).len(), 2);
        assert_eq!(set.for_file(f2).len(), 1);
        assert_eq!(set.len(), 3);

        set.remove_file(f1);
        assert!(set.for_file(f1).is_empty());
        assert_eq!(set.len(), 1);
    }
}
