//! Per-tool parameter schemas — spec §6, §9 ("prefer an explicit per-tool
//! schema... over runtime reflection"). Every struct derives
//! `schemars::JsonSchema` for MCP tool-list introspection the way the
//! teacher's `mcp::mod` request structs do.
//!
//! Each request also flattens an `extra` catch-all so fields absent from
//! its own definition survive deserialization instead of being silently
//! dropped by `Parameters<T>` — that's what lets `unknown_field_warnings`
//! (below) inspect what a caller actually sent (spec §4.6).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Top-level JSON fields a request struct doesn't itself declare, captured
/// via `#[serde(flatten)]`. Excluded from the generated tool schema since
/// it exists only to feed `unknown_field_warnings`, not to advertise a
/// real parameter.
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SearchRequest {
    pub pattern: String,
    #[serde(default)]
    pub flags: Option<String>,
    #[serde(default)]
    pub symbol_types: Option<Vec<String>>,
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub max: Option<usize>,
    #[serde(default)]
    pub semantic: bool,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct GetObjectContextRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub include_full_symbol: bool,
    #[serde(default)]
    pub include_call_hierarchy: bool,
    #[serde(default)]
    pub include_all_references: bool,
    #[serde(default)]
    pub include_dependencies: bool,
    #[serde(default)]
    pub include_file_context: bool,
    #[serde(default)]
    pub include_quality_metrics: bool,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ListSymbolsRequest {
    pub kind: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub exported: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub min_complexity: Option<u32>,
    #[serde(default)]
    pub max_complexity: Option<u32>,
    #[serde(default)]
    pub min_params: Option<u16>,
    #[serde(default)]
    pub max_params: Option<u16>,
    #[serde(default)]
    pub flags: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub max: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct InspectSymbolRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct BrowseFileRequest {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub exported: Option<bool>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub max: Option<usize>,
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub show_imports: bool,
    #[serde(default)]
    pub show_stats: bool,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct IndexStatsRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub include_memory: bool,
    #[serde(default)]
    pub include_watch_mode: bool,
    #[serde(default)]
    pub include_components: bool,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct DebugInfoRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CodebaseIntelligenceRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub tier: Option<u8>,
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub analysis: Option<Vec<String>>,
    #[serde(default)]
    pub metrics: Option<Vec<String>>,
    #[serde(default)]
    pub granularity: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub confidence_threshold: Option<f32>,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub git: Option<serde_json::Value>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SideEffectsRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct GitAnalysisRequest {
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub base_ref: Option<String>,
    #[serde(default)]
    pub target_ref: Option<String>,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
    #[serde(default)]
    pub max_findings: Option<usize>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: ExtraFields,
}

/// Field names a tool recognizes, for the "unknown top-level fields
/// produce warnings" prologue step (spec §4.6). Deliberately plain data
/// (no reflection) per spec §9's "explicit per-tool schema" design note.
pub fn known_fields(tool: &str) -> &'static [&'static str] {
    match tool {
        "search" => &["pattern", "flags", "symbol_types", "include", "output", "max", "semantic"],
        "get_object_context" => &[
            "id",
            "name",
            "file",
            "include_full_symbol",
            "include_call_hierarchy",
            "include_all_references",
            "include_dependencies",
            "include_file_context",
            "include_quality_metrics",
        ],
        "list_symbols" => &[
            "kind", "file", "exported", "name", "receiver", "min_complexity", "max_complexity", "min_params", "max_params", "flags", "sort", "max",
            "offset", "include",
        ],
        "inspect_symbol" => &["name", "id", "file", "type", "include", "max_depth"],
        "browse_file" => &["file", "file_id", "kind", "exported", "sort", "max", "include", "show_imports", "show_stats"],
        "index_stats" => &["mode", "include_memory", "include_watch_mode", "include_components"],
        "debug_info" => &["mode", "file_id", "file_path", "max_results", "verbose"],
        "codebase_intelligence" | "code_insight" => &[
            "mode",
            "tier",
            "include",
            "analysis",
            "metrics",
            "granularity",
            "max_results",
            "confidence_threshold",
            "focus",
            "target",
            "languages",
            "git",
        ],
        "side_effects" => &["mode", "symbol", "file"],
        "git_analysis" => &["scope", "base_ref", "target_ref", "focus", "similarity_threshold", "max_findings"],
        _ => &[],
    }
}

/// Finds fields present in `raw` but absent from a tool's known-field
/// list; surfaced as non-fatal warnings rather than request failures.
pub fn unknown_field_warnings(tool: &str, raw: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
    let known = known_fields(tool);
    raw.keys().filter(|key| !known.contains(&key.as_str())).map(|key| key.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_top_level_field_is_flagged() {
        let raw = json!({"pattern": "foo", "bogus_field": 1});
        let warnings = unknown_field_warnings("search", raw.as_object().unwrap());
        assert_eq!(warnings, vec!["bogus_field".to_string()]);
    }

    #[test]
    fn known_fields_produce_no_warnings() {
        let raw = json!({"pattern": "foo", "max": 10});
        assert!(unknown_field_warnings("search", raw.as_object().unwrap()).is_empty());
    }

    #[test]
    fn flattened_extra_catches_exactly_what_the_request_struct_does_not() {
        let req: SearchRequest = serde_json::from_value(json!({"pattern": "foo", "bogus_field": 1})).unwrap();
        assert_eq!(unknown_field_warnings("search", &req.extra), vec!["bogus_field".to_string()]);
    }
}
