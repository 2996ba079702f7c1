pub mod content_store;
pub mod entry_points;
pub mod reference_tracker;
pub mod trigram;

pub use content_store::ContentStore;
pub use entry_points::EntryPointSet;
pub use reference_tracker::{Edge, RelationKind, ReferenceTracker, RelationshipStats};
pub use trigram::TrigramIndex;
