//! Search pipeline — spec §4.4.

pub mod engine;
pub mod output;
pub mod params;
pub mod scoring;

pub use engine::{HitRole, SearchEngine, SearchHit, SearchResults};
pub use output::{render, truncate};
pub use params::{OutputMode, SearchFlags, SearchParams};
