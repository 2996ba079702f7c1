pub mod auto_index;
pub mod file_info;
pub mod master_index;
pub mod walker;

pub use auto_index::{AutoIndexManager, IndexProgress, IndexState, WatchOp};
pub use file_info::{FileRecord, Import, Language, PerfData};
pub use master_index::{IndexStats, MasterIndex, PendingEdge, TypeCount};
pub use walker::{FileWalker, WalkStats};
