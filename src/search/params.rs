//! Search request parameters — spec §4.4.

use crate::error::{ToolError, ToolResult};
use crate::types::SymbolKind;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SearchFlags: u8 {
        /// Treat `pattern` as a regular expression.
        const REGEX = 0b00001;
        /// Case-insensitive matching.
        const CASE_INSENSITIVE = 0b00010;
        /// Only declaration sites, no usages.
        const DECLARATION_ONLY = 0b00100;
        /// Only usage sites, no declarations.
        const USAGE_ONLY = 0b01000;
        /// Only exported symbols.
        const EXPORTED_ONLY = 0b10000;
    }
}

impl SearchFlags {
    /// Parses the spec's short flag tokens: `rx,ci,dl,ul,eo`. Unknown
    /// tokens are ignored, matching the tool dispatcher's "unknown fields
    /// produce non-fatal warnings" policy (spec §4.6) — callers that care
    /// about that should diff the parsed flags against the raw token list.
    pub fn parse(tokens: &str) -> Self {
        let mut flags = Self::empty();
        for token in tokens.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token {
                "rx" => flags |= Self::REGEX,
                "ci" => flags |= Self::CASE_INSENSITIVE,
                "dl" => flags |= Self::DECLARATION_ONLY,
                "ul" => flags |= Self::USAGE_ONLY,
                "eo" => flags |= Self::EXPORTED_ONLY,
                _ => {}
            }
        }
        flags
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    SingleLine,
    Context,
    Full,
    Files,
    FilesWithMatches,
    Count,
}

impl OutputMode {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "single-line" => Self::SingleLine,
            "context" => Self::Context,
            "full" => Self::Full,
            "files" => Self::Files,
            "files_with_matches" => Self::FilesWithMatches,
            "count" => Self::Count,
            _ => return None,
        })
    }
}

pub const DEFAULT_MAX: usize = 50;
pub const HARD_MAX: usize = 500;
pub const SEMANTIC_CANDIDATE_CAP: usize = 1000;

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub pattern: String,
    pub flags: SearchFlags,
    pub symbol_types: Vec<SymbolKind>,
    pub include_breadcrumbs: bool,
    pub max: usize,
    pub output: OutputMode,
    pub semantic: bool,
}

impl SearchParams {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            flags: SearchFlags::empty(),
            symbol_types: Vec::new(),
            include_breadcrumbs: false,
            max: DEFAULT_MAX,
            output: OutputMode::SingleLine,
            semantic: false,
        }
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_flags(mut self, flags: SearchFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_semantic(mut self, semantic: bool) -> Self {
        self.semantic = semantic;
        self
    }

    /// Validates and clamps: an empty pattern is rejected, `max` is
    /// clamped (never rejected) to `HARD_MAX`, and `dl`+`ul` together are
    /// rejected as contradictory.
    pub fn validated(mut self) -> ToolResult<Self> {
        if self.pattern.trim().is_empty() {
            return Err(ToolError::InvalidParameters {
                reason: "pattern must not be empty".to_string(),
            });
        }
        if self.flags.contains(SearchFlags::DECLARATION_ONLY) && self.flags.contains(SearchFlags::USAGE_ONLY) {
            return Err(ToolError::InvalidParameters {
                reason: "flags dl and ul are mutually exclusive".to_string(),
            });
        }
        self.max = self.max.clamp(1, HARD_MAX);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_flag_tokens_and_ignores_unknown_ones() {
        let flags = SearchFlags::parse("rx,ci,bogus");
        assert!(flags.contains(SearchFlags::REGEX));
        assert!(flags.contains(SearchFlags::CASE_INSENSITIVE));
        assert!(!flags.contains(SearchFlags::DECLARATION_ONLY));
    }

    #[test]
    fn max_above_hard_cap_is_clamped_not_rejected() {
        let params = SearchParams::new("foo").with_max(10_000).validated().unwrap();
        assert_eq!(params.max, HARD_MAX);
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(SearchParams::new("   ").validated().is_err());
    }

    #[test]
    fn declaration_and_usage_only_together_is_rejected() {
        let params = SearchParams::new("foo").with_flags(SearchFlags::DECLARATION_ONLY | SearchFlags::USAGE_ONLY);
        assert!(params.validated().is_err());
    }
}
