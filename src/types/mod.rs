//! Dense identifiers, ranges, symbol kinds and the opaque ID codec.
//!
//! `FileId`/`SymbolId` are append-only within a build: deletion marks a
//! tombstone in the owning table rather than reusing the numeric value, so
//! every consumer that stores an id across a mutation must tolerate holes.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

pub mod opaque_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(NonZeroU32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(NonZeroU32);

impl SymbolId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(self) -> u32 {
        self.0.get()
    }
}

impl FileId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(self) -> u32 {
        self.0.get()
    }
}

/// Monotonic id generator, one per table, shared across parser workers.
#[derive(Debug, Default)]
pub struct SymbolCounter(std::sync::atomic::AtomicU32);

impl SymbolCounter {
    pub fn new() -> Self {
        Self(std::sync::atomic::AtomicU32::new(0))
    }

    pub fn next(&self) -> SymbolId {
        let v = self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        SymbolId::new(v).expect("counter never yields zero")
    }
}

#[derive(Debug, Default)]
pub struct FileCounter(std::sync::atomic::AtomicU32);

impl FileCounter {
    pub fn new() -> Self {
        Self(std::sync::atomic::AtomicU32::new(0))
    }

    pub fn next(&self) -> FileId {
        let v = self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        FileId::new(v).expect("counter never yields zero")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: u32,
    pub start_column: u16,
    pub end_line: u32,
    pub end_column: u16,
}

impl Range {
    pub fn new(start_line: u32, start_column: u16, end_line: u32, end_column: u16) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    pub fn contains(&self, line: u32, column: u16) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && column < self.start_column {
            return false;
        }
        if line == self.end_line && column > self.end_column {
            return false;
        }
        true
    }
}

/// Closed set of symbol kinds from spec §3 (Symbol/EnhancedSymbol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Type,
    Struct,
    Interface,
    Class,
    Enum,
    Variable,
    Constant,
    Field,
    Property,
    Module,
    Namespace,
    Constructor,
    Trait,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Type => "type",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Class => "class",
            Self::Enum => "enum",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Field => "field",
            Self::Property => "property",
            Self::Module => "module",
            Self::Namespace => "namespace",
            Self::Constructor => "constructor",
            Self::Trait => "trait",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "function" => Self::Function,
            "method" => Self::Method,
            "type" => Self::Type,
            "struct" => Self::Struct,
            "interface" => Self::Interface,
            "class" => Self::Class,
            "enum" => Self::Enum,
            "variable" => Self::Variable,
            "constant" => Self::Constant,
            "field" => Self::Field,
            "property" => Self::Property,
            "module" => Self::Module,
            "namespace" => Self::Namespace,
            "constructor" => Self::Constructor,
            "trait" => Self::Trait,
            _ => return None,
        })
    }
}

bitflags::bitflags! {
    /// Function-flag bitfield from spec §3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FunctionFlags: u8 {
        const ASYNC = 0b0001;
        const GENERATOR = 0b0010;
        const METHOD = 0b0100;
        const VARIADIC = 0b1000;
    }
}

bitflags::bitflags! {
    /// Variable-flag bitfield from spec §3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct VariableFlags: u8 {
        const MUTABLE = 0b0001;
        const STATIC = 0b0010;
        const EXPORTED = 0b0100;
    }
}

pub type CompactString = Box<str>;

pub fn compact_string(s: &str) -> CompactString {
    s.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_id_rejects_zero() {
        assert!(SymbolId::new(0).is_none());
        assert_eq!(SymbolId::new(7).unwrap().value(), 7);
    }

    #[test]
    fn file_id_rejects_zero() {
        assert!(FileId::new(0).is_none());
        assert_eq!(FileId::new(3).unwrap().value(), 3);
    }

    #[test]
    fn counters_are_dense_and_start_at_one() {
        let c = SymbolCounter::new();
        assert_eq!(c.next().value(), 1);
        assert_eq!(c.next().value(), 2);
        assert_eq!(c.next().value(), 3);
    }

    #[test]
    fn range_contains_boundaries() {
        let r = Range::new(10, 5, 15, 20);
        assert!(r.contains(12, 0));
        assert!(r.contains(10, 5));
        assert!(r.contains(15, 20));
        assert!(!r.contains(9, 0));
        assert!(!r.contains(16, 0));
        assert!(!r.contains(10, 4));
        assert!(!r.contains(15, 21));
    }

    #[test]
    fn symbol_kind_round_trips_through_str() {
        for kind in [
            SymbolKind::Function,
            SymbolKind::Method,
            SymbolKind::Struct,
            SymbolKind::Trait,
            SymbolKind::Constructor,
        ] {
            assert_eq!(SymbolKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SymbolKind::parse("not-a-kind"), None);
    }

    #[test]
    fn function_flags_combine() {
        let f = FunctionFlags::ASYNC | FunctionFlags::METHOD;
        assert!(f.contains(FunctionFlags::ASYNC));
        assert!(f.contains(FunctionFlags::METHOD));
        assert!(!f.contains(FunctionFlags::VARIADIC));
    }
}
