//! Common interface every language parser implements — spec §4.1's
//! per-file worker output `(FileInfo, []EnhancedSymbol, []ReferenceEdge,
//! []PerfRecord)` flows through this trait. Tree-sitter grammars
//! themselves are out of scope (spec §1): this trait is the interface a
//! parser is "consumed at".

use crate::indexing::file_info::{Import, Language, PerfData};
use crate::symbol::EnhancedSymbol;
use crate::types::{FileId, Range, SymbolCounter};

pub trait LanguageParser: Send {
    fn parse(&mut self, code: &str, file_id: FileId, counter: &SymbolCounter) -> Vec<EnhancedSymbol>;

    /// (caller_name, callee_name, range) — owned because call targets
    /// sometimes need synthesis (e.g. `self.foo()` receivers).
    fn find_calls(&mut self, code: &str) -> Vec<(String, String, Range)>;

    fn find_implementations(&mut self, code: &str) -> Vec<(String, String, Range)> {
        Vec::new()
    }

    fn find_extends(&mut self, _code: &str) -> Vec<(String, String, Range)> {
        Vec::new()
    }

    fn find_imports(&mut self, code: &str) -> Vec<Import>;

    fn extract_perf_data(&mut self, code: &str) -> PerfData;

    fn language(&self) -> Language;
}

pub trait ParserFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn LanguageParser>, String>;
}
