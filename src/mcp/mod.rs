//! MCP tool dispatcher — spec §4.6, §6. `#[tool_router]` and the
//! `Parameters<T>` extraction style are grounded on the teacher's
//! `mcp/mod.rs`; every handler here follows the spec's common prologue
//! (readiness check, enum validation, panic isolation, cancellation) the
//! teacher's handlers don't explicitly implement. `ServerHandler::call_tool`
//! is hand-written rather than generated by `#[tool_handler]` so it can scope
//! each dispatch to its own cancellation token before calling the router.

pub mod json;
pub mod lcf;
pub mod schema;

use crate::analysis::{self, Purity};
use crate::error::{ErrorKind, ToolError, ToolResult};
use crate::git::{GitAnalysisParams, GitProvider, GitScope, ProcessGitProvider};
use crate::indexing::master_index::require_populated;
use crate::indexing::{AutoIndexManager, MasterIndex};
use crate::search::{OutputMode, SearchEngine, SearchFlags, SearchParams};
use crate::symbol::EnhancedSymbol;
use crate::types::{opaque_id, SymbolId, SymbolKind};
use lcf::{LcfBuilder, TOP_N_LARGE, TOP_N_MEDIUM};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::ToolCallContext;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::model::ErrorData as McpError;
use rmcp::service::RequestContext;
use rmcp::{tool, tool_router, RoleServer, ServerHandler};
use schema::*;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

tokio::task_local! {
    /// Cancellation token for the call currently being dispatched, scoped by
    /// `call_tool` before it hands off to the tool router (spec §5). Handlers
    /// read it through `check_cancelled` rather than taking it as a parameter,
    /// since rmcp's `#[tool]` methods aren't given `RequestContext` directly.
    static CANCEL: CancellationToken;
}

/// Checked in the shared `ready` prologue and in long-running handlers'
/// coarse phases so a cancelled call stops before doing more work.
fn check_cancelled() -> ToolResult<()> {
    if CANCEL.try_with(|ct| ct.is_cancelled()).unwrap_or(false) {
        return Err(ToolError::Cancelled);
    }
    Ok(())
}

/// Every tool body runs inside this shim so a panic becomes a structured
/// `InternalPanic` response instead of taking the server down (spec §4.6).
fn isolated<F: FnOnce() -> ToolResult<String>>(tool_name: &str, f: F) -> ToolResult<String> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(tool = tool_name, message, "tool handler panicked");
            Err(ToolError::InternalPanic { message })
        }
    }
}

fn tool_result_text(result: ToolResult<String>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(err) => {
            let envelope = json::ErrorEnvelope::from_error(&err);
            Ok(CallToolResult::success(vec![Content::text(envelope.to_json().to_string())]))
        }
    }
}

/// Appends a `WARNINGS` section to a successful body when the caller sent
/// top-level fields the tool doesn't recognize (spec §4.6). A no-op on the
/// error path and when `warnings` is empty, so it never disturbs the LCF
/// header contract `tests/end_to_end.rs` checks against.
fn with_warnings(result: ToolResult<String>, warnings: Vec<String>) -> ToolResult<String> {
    result.map(|body| {
        if warnings.is_empty() {
            return body;
        }
        let mut out = body;
        out.push_str("== WARNINGS ==\n");
        for field in &warnings {
            out.push_str("unknown_field=");
            out.push_str(field);
            out.push('\n');
        }
        out.push_str("---\n");
        out
    })
}

fn resolve_symbol(index: &MasterIndex, id: Option<&str>, name: Option<&str>, file: Option<&str>) -> ToolResult<EnhancedSymbol> {
    if let Some(token) = id {
        let value = opaque_id::decode(token).ok_or_else(|| crate::error::opaque_id_not_found(token))?;
        let symbol_id = SymbolId::new(value).ok_or_else(|| crate::error::opaque_id_not_found(token))?;
        return index.get_symbol_by_id(symbol_id).ok_or_else(|| crate::error::opaque_id_not_found(token));
    }
    if let Some(name) = name {
        let mut matches = index.find_symbols_by_name(name);
        if let Some(file) = file {
            matches.retain(|s| index.get_file(s.file_id).is_some_and(|f| f.path.as_ref() == file));
        }
        return matches.into_iter().next().ok_or_else(|| ToolError::NotFound { what: "symbol", query: name.to_string() });
    }
    Err(ToolError::InvalidParameters { reason: "one of id or name is required".to_string() })
}

fn resolve_file(index: &MasterIndex, file: Option<&str>, file_id: Option<&str>) -> ToolResult<crate::indexing::file_info::FileRecord> {
    if let Some(token) = file_id {
        let value = opaque_id::decode(token).ok_or_else(|| crate::error::opaque_id_not_found(token))?;
        let id = crate::types::FileId::new(value).ok_or_else(|| crate::error::opaque_id_not_found(token))?;
        return index.get_file(id).ok_or_else(|| crate::error::opaque_id_not_found(token));
    }
    if let Some(path) = file {
        let id = index.find_file_id_by_path(path).ok_or_else(|| ToolError::NotFound { what: "file", query: path.to_string() })?;
        return index.get_file(id).ok_or_else(|| ToolError::NotFound { what: "file", query: path.to_string() });
    }
    Err(ToolError::InvalidParameters { reason: "one of file or file_id is required".to_string() })
}

fn enum_error(field: &'static str, value: &str, valid: &[&str]) -> ToolError {
    ToolError::OutOfRange { field, value: value.to_string(), valid: valid.join(", ") }
}

#[derive(Clone)]
pub struct CodeIntelligenceServer {
    pub index: Arc<MasterIndex>,
    pub auto_index: Arc<AutoIndexManager>,
    pub git: Arc<dyn GitProvider>,
    pub project_root: Arc<Path>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CodeIntelligenceServer {
    pub fn new(index: Arc<MasterIndex>, auto_index: Arc<AutoIndexManager>, project_root: impl Into<Arc<Path>>) -> Self {
        Self {
            index,
            auto_index,
            git: Arc::new(ProcessGitProvider),
            project_root: project_root.into(),
            tool_router: Self::tool_router(),
        }
    }

    fn ready(&self) -> ToolResult<()> {
        check_cancelled()?;
        self.auto_index.check_indexing_complete()?;
        require_populated(&self.index)
    }

    #[tool(description = "Search symbols by pattern: literal, regex, or fuzzy/semantic")]
    pub async fn search(&self, Parameters(req): Parameters<SearchRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("search", &req.extra);
        tool_result_text(with_warnings(isolated("search", || {
            self.ready()?;
            let flags = req.flags.as_deref().map(SearchFlags::parse).unwrap_or_default();
            let output = req
                .output
                .as_deref()
                .map(|s| OutputMode::parse(s).ok_or_else(|| enum_error("output", s, &["single-line", "context", "full", "files", "files_with_matches", "count"])))
                .transpose()?
                .unwrap_or(OutputMode::SingleLine);
            let symbol_types = req
                .symbol_types
                .unwrap_or_default()
                .iter()
                .filter_map(|s| SymbolKind::parse(s))
                .collect();

            let mut params = SearchParams::new(req.pattern)
                .with_flags(flags)
                .with_output(output)
                .with_semantic(req.semantic);
            params.symbol_types = symbol_types;
            if let Some(max) = req.max {
                params = params.with_max(max);
            }
            let params = params.validated()?;

            let engine = SearchEngine::new(&self.index);
            let results = engine.search(&params)?;
            let index = Arc::clone(&self.index);
            Ok(crate::search::render(params.output, &results, move |path| {
                index.find_file_id_by_path(path).and_then(|id| index.content().get(id)).map(|c| c.to_string())
            }))
        }), warnings))
    }

    #[tool(description = "Fetch full context for one symbol: signature, references, call hierarchy, dependencies")]
    pub async fn get_object_context(&self, Parameters(req): Parameters<GetObjectContextRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("get_object_context", &req.extra);
        tool_result_text(with_warnings(isolated("get_object_context", || {
            self.ready()?;
            let symbol = resolve_symbol(&self.index, req.id.as_deref(), req.name.as_deref(), req.file.as_deref())?;
            let file = self.index.get_file(symbol.file_id);

            let mut b = LcfBuilder::new("mode=object_context");
            b.section("SYMBOL");
            b.kv("id", opaque_id::encode(symbol.id.value()));
            b.kv("name", symbol.name.as_ref());
            b.kv("kind", symbol.kind.as_str());
            b.kv("exported", symbol.exported);
            if req.include_full_symbol {
                if let Some(sig) = &symbol.signature {
                    b.kv("signature", sig.as_ref());
                }
                b.kv("complexity", symbol.cyclomatic_complexity);
            }
            b.end_section();

            if req.include_call_hierarchy {
                b.section("CALL_HIERARCHY");
                let callees = self.index.tracker().calls_to(symbol.id);
                let callers = self.index.tracker().called_by(symbol.id);
                b.kv("callees", callees.len());
                b.kv("callers", callers.len());
                b.top_n(&callees, TOP_N_MEDIUM, |id| name_or_id(&self.index, *id));
                b.end_section();
            }

            if req.include_all_references {
                b.section("REFERENCES");
                let incoming = self.index.tracker().incoming_for(symbol.id);
                b.kv("incoming", incoming.len());
                b.top_n(&incoming, TOP_N_LARGE, |e| format!("{:?} at line {}", e.kind, e.line));
                b.end_section();
            }

            if req.include_dependencies {
                if let Some(file) = &file {
                    b.section("DEPENDENCIES");
                    b.top_n(&file.imports, TOP_N_MEDIUM, |i| i.path.to_string());
                    b.end_section();
                }
            }

            if req.include_file_context {
                if let Some(file) = &file {
                    b.section("FILE");
                    b.kv("path", file.path.as_ref());
                    b.kv("language", file.language.as_str());
                    b.kv("symbols", file.symbols.len());
                    b.end_section();
                }
            }

            if req.include_quality_metrics {
                b.section("QUALITY");
                b.kv("complexity_bucket", format!("{:?}", symbol.complexity_bucket()));
                b.kv("importance_score", format!("{:.1}", symbol.importance_score()));
                b.end_section();
            }

            Ok(b.build())
        }), warnings))
    }

    #[tool(description = "List symbols matching a kind and optional filters, sorted and paginated")]
    pub async fn list_symbols(&self, Parameters(req): Parameters<ListSymbolsRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("list_symbols", &req.extra);
        tool_result_text(with_warnings(isolated("list_symbols", || {
            self.ready()?;
            let kind = SymbolKind::parse(&req.kind).ok_or_else(|| {
                enum_error(
                    "kind",
                    &req.kind,
                    &["function", "method", "type", "struct", "interface", "class", "enum", "variable", "constant", "field", "property", "module", "namespace", "constructor", "trait"],
                )
            })?;

            let mut symbols: Vec<EnhancedSymbol> = self
                .index
                .get_all_files()
                .into_iter()
                .filter(|f| req.file.as_deref().is_none_or(|path| f.path.as_ref() == path))
                .flat_map(|f| f.symbols)
                .filter(|s| s.kind == kind)
                .filter(|s| req.exported.is_none_or(|e| s.exported == e))
                .filter(|s| req.name.as_deref().is_none_or(|n| s.name.as_ref().contains(n)))
                .filter(|s| req.receiver.as_deref().is_none_or(|r| s.receiver_type.as_deref() == Some(r)))
                .filter(|s| req.min_complexity.is_none_or(|m| s.cyclomatic_complexity >= m))
                .filter(|s| req.max_complexity.is_none_or(|m| s.cyclomatic_complexity <= m))
                .filter(|s| req.min_params.is_none_or(|m| s.parameter_count >= m))
                .filter(|s| req.max_params.is_none_or(|m| s.parameter_count <= m))
                .collect();

            match req.sort.as_deref() {
                Some("complexity") => symbols.sort_by(|a, b| b.cyclomatic_complexity.cmp(&a.cyclomatic_complexity)),
                Some("refs") => symbols.sort_by(|a, b| b.incoming.len().cmp(&a.incoming.len())),
                Some("line") => symbols.sort_by(|a, b| a.range.start_line.cmp(&b.range.start_line)),
                Some("params") => symbols.sort_by(|a, b| b.parameter_count.cmp(&a.parameter_count)),
                None | Some("name") => symbols.sort_by(|a, b| a.name.cmp(&b.name)),
                Some(other) => return Err(enum_error("sort", other, &["name", "complexity", "refs", "line", "params"])),
            }

            let offset = req.offset.unwrap_or(0);
            let max = req.max.unwrap_or(50).min(500);
            let total = symbols.len();
            let page: Vec<EnhancedSymbol> = symbols.into_iter().skip(offset).take(max).collect();

            let mut b = LcfBuilder::new("mode=list_symbols");
            b.section("SYMBOLS");
            b.kv("total", total);
            for symbol in &page {
                let mut line = format!(
                    "o={} n={} t={} e={} c={}",
                    opaque_id::encode(symbol.id.value()),
                    symbol.name,
                    symbol.kind.as_str(),
                    symbol.exported as u8,
                    symbol.cyclomatic_complexity
                );
                if let Some(receiver) = &symbol.receiver_type {
                    line.push_str(&format!(" r={receiver}"));
                }
                b.line(line);
            }
            b.end_section();
            Ok(b.build())
        }), warnings))
    }

    #[tool(description = "Inspect one symbol in depth: signature, docs, callers/callees, scope, annotations")]
    pub async fn inspect_symbol(&self, Parameters(req): Parameters<InspectSymbolRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("inspect_symbol", &req.extra);
        tool_result_text(with_warnings(isolated("inspect_symbol", || {
            self.ready()?;
            let symbol = resolve_symbol(&self.index, req.id.as_deref(), req.name.as_deref(), req.file.as_deref())?;
            let include = req.include.unwrap_or_else(|| vec!["all".to_string()]);
            let want = |section: &str| include.iter().any(|i| i == "all" || i == section);
            let max_depth = req.max_depth.unwrap_or(3).max(1);

            let mut b = LcfBuilder::new("mode=inspect_symbol");
            b.section("SYMBOL");
            b.kv("id", opaque_id::encode(symbol.id.value()));
            b.kv("name", symbol.name.as_ref());
            b.kv("kind", symbol.kind.as_str());
            if want("signature") {
                if let Some(sig) = &symbol.signature {
                    b.kv("signature", sig.as_ref());
                }
            }
            if want("doc") {
                if let Some(doc) = &symbol.doc_comment {
                    b.kv("doc", doc.as_ref());
                }
            }
            if want("scope") {
                b.kv("scope", symbol.scope_chain.join("::"));
            }
            if want("annotations") {
                b.kv("annotations", symbol.annotations.len());
            }
            if want("flags") {
                b.kv("function_flags", format!("{:?}", symbol.function_flags));
                b.kv("variable_flags", format!("{:?}", symbol.variable_flags));
            }
            b.end_section();

            if want("callers") {
                b.section("CALLERS");
                let callers = bfs(&self.index, symbol.id, max_depth, true);
                b.top_n(&callers, TOP_N_LARGE, |id| name_or_id(&self.index, *id));
                b.end_section();
            }
            if want("callees") {
                b.section("CALLEES");
                let callees = bfs(&self.index, symbol.id, max_depth, false);
                b.top_n(&callees, TOP_N_LARGE, |id| name_or_id(&self.index, *id));
                b.end_section();
            }
            if want("type_hierarchy") {
                b.section("TYPE_HIERARCHY");
                let implementors = self.index.tracker().implementors(symbol.id);
                let derived = self.index.tracker().derived_types(symbol.id);
                b.kv("implementors", implementors.len());
                b.kv("derived_types", derived.len());
                b.end_section();
            }
            if want("refs") {
                b.section("REFS");
                let incoming = self.index.tracker().incoming_for(symbol.id);
                b.kv("incoming", incoming.len());
                b.end_section();
            }

            Ok(b.build())
        }), warnings))
    }

    #[tool(description = "Browse the symbols declared in one file")]
    pub async fn browse_file(&self, Parameters(req): Parameters<BrowseFileRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("browse_file", &req.extra);
        tool_result_text(with_warnings(isolated("browse_file", || {
            self.ready()?;
            let file = resolve_file(&self.index, req.file.as_deref(), req.file_id.as_deref())?;

            let mut symbols: Vec<EnhancedSymbol> = file
                .symbols
                .iter()
                .filter(|s| req.kind.as_deref().is_none_or(|k| SymbolKind::parse(k) == Some(s.kind)))
                .filter(|s| req.exported.is_none_or(|e| s.exported == e))
                .cloned()
                .collect();
            match req.sort.as_deref() {
                Some("complexity") => symbols.sort_by(|a, b| b.cyclomatic_complexity.cmp(&a.cyclomatic_complexity)),
                Some("line") | None => symbols.sort_by(|a, b| a.range.start_line.cmp(&b.range.start_line)),
                Some(other) => return Err(enum_error("sort", other, &["line", "complexity"])),
            }
            let max = req.max.unwrap_or(50).min(500);
            symbols.truncate(max);

            let mut b = LcfBuilder::new("mode=browse_file");
            b.section("FILE");
            b.kv("path", file.path.as_ref());
            b.kv("language", file.language.as_str());
            b.end_section();

            b.section("SYMBOLS");
            for symbol in &symbols {
                b.line(format!("{}:{} n={} t={}", symbol.range.start_line, symbol.range.start_column, symbol.name, symbol.kind.as_str()));
            }
            b.end_section();

            if req.show_imports {
                b.section("IMPORTS");
                b.top_n(&file.imports, TOP_N_LARGE, |i| i.path.to_string());
                b.end_section();
            }
            if req.show_stats {
                b.section("STATS");
                b.kv("symbol_count", file.symbols.len());
                b.kv("import_count", file.imports.len());
                b.end_section();
            }

            Ok(b.build())
        }), warnings))
    }

    #[tool(description = "Report index build status and size")]
    pub async fn index_stats(&self, Parameters(req): Parameters<IndexStatsRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("index_stats", &req.extra);
        tool_result_text(with_warnings(isolated("index_stats", || {
            let mode = req.mode.as_deref().unwrap_or("summary");
            let stats = self.index.get_index_stats();
            let progress = self.auto_index.progress();

            let mut b = LcfBuilder::new(format!("mode={mode}"));
            b.section("STATS");
            b.kv("files", stats.file_count);
            b.kv("symbols", stats.symbol_count);
            match mode {
                "summary" => {}
                "detailed" => {
                    b.kv("trigram_files", stats.trigram_file_count);
                    b.kv("content_cached_files", stats.content_cached_files);
                }
                "progress" => {
                    b.kv("files_processed", progress.files_processed);
                    b.kv("total_files", progress.total_files);
                    b.kv("indexing_progress", progress.indexing_progress);
                }
                "health" => {
                    b.kv("calls", stats.relationships.calls);
                    b.kv("references", stats.relationships.references);
                }
                other => return Err(enum_error("mode", other, &["summary", "detailed", "progress", "health"])),
            }
            if req.include_memory {
                b.kv("trigram_indexed_files", self.index.trigrams().indexed_file_count());
            }
            if req.include_watch_mode {
                b.kv("state", format!("{:?}", self.auto_index.state()));
            }
            if req.include_components {
                b.kv("content_store_len", self.index.content().len());
            }
            b.end_section();
            Ok(b.build())
        }), warnings))
    }

    #[tool(description = "Dump raw index internals for debugging")]
    pub async fn debug_info(&self, Parameters(req): Parameters<DebugInfoRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("debug_info", &req.extra);
        tool_result_text(with_warnings(isolated("debug_info", || {
            self.ready()?;
            let mode = req.mode.as_deref().unwrap_or("overview");
            let max = req.max_results.unwrap_or(50).min(500);

            let mut b = LcfBuilder::new(format!("mode={mode}"));
            b.section("DEBUG");
            match mode {
                "overview" => {
                    b.kv("files", self.index.get_file_count());
                    b.kv("symbols", self.index.get_symbol_count());
                }
                "symbols" => {
                    let symbols = self.index.get_top_symbols(max);
                    b.top_n(&symbols, max, |s| format!("{} ({})", s.name, s.kind.as_str()));
                }
                "references" => {
                    let stats = self.index.tracker().relationship_stats();
                    b.kv("calls", stats.calls);
                    b.kv("references", stats.references);
                    b.kv("implements", stats.implements);
                    b.kv("extends", stats.extends);
                }
                "types" => {
                    for t in self.index.get_type_distribution() {
                        b.line(format!("{}: {}", t.kind.as_str(), t.count));
                    }
                }
                "files" => {
                    let file = if let (None, None) = (&req.file_id, &req.file_path) {
                        None
                    } else {
                        Some(resolve_file(&self.index, req.file_path.as_deref(), req.file_id.as_deref())?)
                    };
                    match file {
                        Some(f) => {
                            b.kv("path", f.path.as_ref());
                            b.kv("symbols", f.symbols.len());
                        }
                        None => {
                            for f in self.index.get_all_files().into_iter().take(max) {
                                b.line(f.path.to_string());
                            }
                        }
                    }
                }
                other => return Err(enum_error("mode", other, &["overview", "symbols", "references", "types", "files"])),
            }
            if req.verbose {
                b.kv("verbose", true);
            }
            b.end_section();
            Ok(b.build())
        }), warnings))
    }

    #[tool(description = "Repository-wide intelligence: overview, statistics, module structure, git-aware change analysis")]
    pub async fn codebase_intelligence(&self, Parameters(req): Parameters<CodebaseIntelligenceRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("codebase_intelligence", &req.extra);
        tool_result_text(with_warnings(isolated("codebase_intelligence", || self.codebase_intelligence_impl(req)), warnings))
    }

    #[tool(description = "Alias of codebase_intelligence")]
    pub async fn code_insight(&self, Parameters(req): Parameters<CodebaseIntelligenceRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("code_insight", &req.extra);
        tool_result_text(with_warnings(isolated("code_insight", || self.codebase_intelligence_impl(req)), warnings))
    }

    fn codebase_intelligence_impl(&self, req: CodebaseIntelligenceRequest) -> ToolResult<String> {
        check_cancelled()?;
        let mode = req.mode.as_deref().unwrap_or("overview");
        let tier = req.tier.unwrap_or(1);
        if !(1..=3).contains(&tier) {
            return Err(enum_error("tier", &tier.to_string(), &["1", "2", "3"]));
        }

        if !matches!(mode, "git_analyze" | "git_hotspots") {
            self.ready()?;
        }

        let mut b = LcfBuilder::new(format!("mode={mode} tier={tier}"));
        match mode {
            "overview" => {
                b.section("REPOSITORY MAP");
                b.kv("files", self.index.get_file_count());
                b.kv("symbols", self.index.get_symbol_count());
                b.end_section();
            }
            "detailed" | "statistics" => {
                let stats = self.index.get_index_stats();
                b.section("STATISTICS");
                b.kv("files", stats.file_count);
                b.kv("symbols", stats.symbol_count);
                b.kv("calls", stats.relationships.calls);
                b.kv("references", stats.relationships.references);
                b.end_section();
            }
            "unified" => {
                b.section("HEALTH");
                b.kv("files", self.index.get_file_count());
                b.kv("symbols", self.index.get_symbol_count());
                b.end_section();
                let symbols = self.index.get_top_symbols(usize::MAX);
                let dist = analysis::complexity::distribution(&symbols);
                b.section("COMPLEXITY");
                b.kv("average", format!("{:.1}", dist.average));
                b.kv("max", dist.max);
                b.end_section();
            }
            "structure" => {
                let packages = analysis::analyze_packages(&self.index);
                let packages: Vec<_> = match &req.focus {
                    Some(focus) => packages.into_iter().filter(|p| p.package.to_lowercase().contains(&focus.to_lowercase())).collect(),
                    None => packages,
                };
                b.section("MODULES");
                b.top_n(&packages, TOP_N_LARGE, |p| format!("{} cohesion={:.2} stability={:.2}", p.package, p.cohesion, p.stability));
                b.end_section();
            }
            "type_hierarchy" => {
                let symbols = self.index.get_top_symbols(usize::MAX);
                let types: Vec<_> = symbols.into_iter().filter(|s| matches!(s.kind, SymbolKind::Class | SymbolKind::Struct | SymbolKind::Trait | SymbolKind::Interface)).collect();
                b.section("TYPE_HIERARCHY");
                b.top_n(&types, TOP_N_LARGE, |s| s.name.to_string());
                b.end_section();
            }
            "git_analyze" => {
                check_cancelled()?;
                let scope = GitScope::parse(req.target.as_deref().unwrap_or("wip")).ok_or_else(|| enum_error("target", req.target.as_deref().unwrap_or(""), &["staged", "wip", "commit", "range"]))?;
                let analysis = self.git.changes(&self.project_root, &GitAnalysisParams::new(scope))?;
                b.section("GIT_CHANGES");
                b.top_n(&analysis.changes, TOP_N_LARGE, |c| format!("{} (+{} -{})", c.path, c.lines_added, c.lines_removed));
                b.end_section();
            }
            "git_hotspots" => {
                check_cancelled()?;
                let hotspots = self.git.hotspots(&self.project_root, 30)?;
                b.section("GIT_HOTSPOTS");
                b.top_n(&hotspots, TOP_N_LARGE, |h| format!("{} commits={}", h.path, h.commits));
                b.end_section();
            }
            other => return Err(enum_error("mode", other, &["overview", "detailed", "statistics", "unified", "structure", "git_analyze", "git_hotspots", "type_hierarchy"])),
        }
        Ok(b.build())
    }

    #[tool(description = "Classify symbols or files as pure or side-effecting")]
    pub async fn side_effects(&self, Parameters(req): Parameters<SideEffectsRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("side_effects", &req.extra);
        tool_result_text(with_warnings(isolated("side_effects", || {
            self.ready()?;
            let mode = req.mode.as_deref().unwrap_or("summary");
            let files = self.index.get_all_files();
            let all: Vec<analysis::SymbolPurity> = files.iter().flat_map(analysis::classify_file_purity).collect();

            let mut b = LcfBuilder::new(format!("mode={mode}"));
            match mode {
                "summary" => {
                    let summary = analysis::summarize_purity(&all);
                    b.section("PURITY");
                    b.kv("pure", summary.pure);
                    b.kv("impure", summary.impure);
                    b.end_section();
                }
                "symbol" => {
                    let name = req.symbol.as_deref().ok_or_else(|| ToolError::InvalidParameters { reason: "symbol is required for mode=symbol".to_string() })?;
                    let symbol = resolve_symbol(&self.index, None, Some(name), req.file.as_deref())?;
                    let file = self.index.get_file(symbol.file_id).ok_or_else(|| ToolError::NotFound { what: "file", query: name.to_string() })?;
                    b.section("PURITY");
                    match analysis::classify_purity(&file, &symbol) {
                        Purity::Pure => {
                            b.kv("pure", true);
                        }
                        Purity::Impure { categories } => {
                            b.kv("pure", false);
                            b.kv("categories", categories.join(","));
                        }
                    }
                    b.end_section();
                }
                "file" => {
                    let file = resolve_file(&self.index, req.file.as_deref(), None)?;
                    let results = analysis::classify_file_purity(&file);
                    let summary = analysis::summarize_purity(&results);
                    b.section("PURITY");
                    b.kv("pure", summary.pure);
                    b.kv("impure", summary.impure);
                    b.end_section();
                }
                "pure" | "impure" => {
                    let want_pure = mode == "pure";
                    let filtered: Vec<_> = all.iter().filter(|r| matches!(r.purity, Purity::Pure) == want_pure).collect();
                    b.section("SYMBOLS");
                    b.top_n(&filtered, TOP_N_LARGE, |r| r.name.to_string());
                    b.end_section();
                }
                "category" => {
                    b.section("CATEGORIES");
                    let mut counts: std::collections::BTreeMap<&'static str, usize> = std::collections::BTreeMap::new();
                    for r in &all {
                        if let Purity::Impure { categories } = &r.purity {
                            for c in categories {
                                *counts.entry(c).or_default() += 1;
                            }
                        }
                    }
                    for (category, count) in counts {
                        b.kv(category, count);
                    }
                    b.end_section();
                }
                other => return Err(enum_error("mode", other, &["summary", "symbol", "file", "pure", "impure", "category"])),
            }
            Ok(b.build())
        }), warnings))
    }

    #[tool(description = "Analyze a git diff scope: staged changes, working tree, a commit, or a ref range")]
    pub async fn git_analysis(&self, Parameters(req): Parameters<GitAnalysisRequest>) -> Result<CallToolResult, McpError> {
        let warnings = schema::unknown_field_warnings("git_analysis", &req.extra);
        tool_result_text(with_warnings(isolated("git_analysis", || {
            check_cancelled()?;
            let scope_str = req.scope.as_deref().unwrap_or("wip");
            let scope = GitScope::parse(scope_str).ok_or_else(|| enum_error("scope", scope_str, &["staged", "wip", "commit", "range"]))?;

            let mut params = GitAnalysisParams::new(scope);
            params.base_ref = req.base_ref;
            params.target_ref = req.target_ref;
            params.focus = req.focus;
            if let Some(threshold) = req.similarity_threshold {
                params.similarity_threshold = threshold;
            }
            if let Some(max) = req.max_findings {
                params.max_findings = max;
            }

            let analysis = self.git.changes(&self.project_root, &params)?;
            check_cancelled()?;

            let mut b = LcfBuilder::new(format!("mode={scope_str}"));
            b.section("CHANGES");
            b.kv("count", analysis.changes.len());
            b.kv("truncated", analysis.truncated);
            for change in &analysis.changes {
                b.line(format!("{} {:?} +{} -{}", change.path, change.kind, change.lines_added, change.lines_removed));
            }
            b.end_section();
            Ok(b.build())
        }), warnings))
    }
}

fn name_or_id(index: &MasterIndex, id: SymbolId) -> String {
    index.get_symbol_by_id(id).map(|s| s.name.to_string()).unwrap_or_else(|| opaque_id::encode(id.value()))
}

/// Breadth-first walk of the call graph up to `max_depth`, used by
/// `inspect_symbol`'s caller/callee sections (spec §6's `max_depth`).
fn bfs(index: &MasterIndex, start: SymbolId, max_depth: u32, incoming: bool) -> Vec<SymbolId> {
    let mut seen = std::collections::HashSet::new();
    let mut frontier = vec![start];
    let mut out = Vec::new();
    seen.insert(start);

    for _ in 0..max_depth {
        let mut next = Vec::new();
        for id in &frontier {
            let neighbors = if incoming { index.tracker().called_by(*id) } else { index.tracker().calls_to(*id) };
            for n in neighbors {
                if seen.insert(n) {
                    out.push(n);
                    next.push(n);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    out
}

// Manual impl (no #[tool_handler]) so call_tool can scope each dispatch to
// its own cancellation token (spec §5) before handing off to the router.
impl ServerHandler for CodeIntelligenceServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(
                Implementation::new("codeintel", env!("CARGO_PKG_VERSION"))
                    .with_title("Code Intelligence Server"),
            )
            .with_instructions(
                "Language-aware code intelligence over this repository. Start with `search` to locate \
                symbols, then `get_object_context` or `inspect_symbol` for detail. Use `codebase_intelligence` \
                for repository-wide structure and `git_analysis` for change-aware review. `index_stats` reports \
                readiness while indexing runs.",
            )
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let ct = context.ct.clone();
        let tcc = ToolCallContext::new(self, request, context);
        CANCEL.scope(ct, self.tool_router.call(tcc)).await
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::indexing::MasterIndex;

    fn empty_server() -> CodeIntelligenceServer {
        let index = Arc::new(MasterIndex::new(1, 1024));
        let auto_index = Arc::new(AutoIndexManager::new(50));
        let _ = auto_index.start(Path::new("/nonexistent"), &Settings::default(), &index);
        CodeIntelligenceServer::new(index, auto_index, Path::new("."))
    }

    #[test]
    fn ready_check_reports_not_ready_for_empty_index() {
        let server = empty_server();
        let err = server.ready().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotReady);
    }
}
