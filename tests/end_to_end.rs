//! End-to-end scenarios — spec §8's six concrete walkthroughs plus the
//! boundary behaviors, built over small fixture trees the way the
//! teacher's larger flows live under `tests/`.

use codeintel::cli::build_index;
use codeintel::config::Settings;
use codeintel::mcp::schema::{CodebaseIntelligenceRequest, ListSymbolsRequest, SearchRequest};
use codeintel::mcp::CodeIntelligenceServer;
use rmcp::handler::server::wrapper::Parameters;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

async fn server_over(files: &[(&str, &str)]) -> (tempfile::TempDir, CodeIntelligenceServer) {
    let dir = tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    let settings = Settings::default();
    let (index, manager) = build_index(dir.path(), &settings).await.unwrap();
    let server = CodeIntelligenceServer::new(index, manager, dir.path());
    (dir, server)
}

fn text_of(result: rmcp::model::CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|c| match &**c {
            rmcp::model::RawContent::Text(text) => Some(text.text.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scenario 1: a struct with one method and a `main` calling it.
#[tokio::test]
async fn scenario_one_struct_with_method_and_caller() {
    let (_dir, server) = server_over(&[(
        "service.rs",
        "struct Service;\n\nimpl Service {\n    pub fn process(&self) {}\n}\n\nfn main() {\n    let s = Service;\n    s.process();\n}\n",
    )])
    .await;

    assert_eq!(server.index.get_file_count(), 1);
    assert!(server.index.get_symbol_count() >= 3);

    let result = server
        .list_symbols(Parameters(ListSymbolsRequest {
            kind: "method".to_string(),
            file: None,
            exported: None,
            name: None,
            receiver: None,
            min_complexity: None,
            max_complexity: None,
            min_params: None,
            max_params: None,
            flags: None,
            sort: None,
            max: None,
            offset: None,
            include: None,
            extra: Default::default(),
        }))
        .await
        .unwrap();
    let text = text_of(result);
    assert_eq!(text.matches("n=process").count(), 1);
}

/// Scenario 2: an empty directory must answer `NotReady`, not a timeout.
#[tokio::test]
async fn scenario_two_empty_directory_is_not_ready_not_timeout() {
    let (_dir, server) = server_over(&[]).await;

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        server.codebase_intelligence(Parameters(CodebaseIntelligenceRequest {
            mode: Some("overview".to_string()),
            tier: None,
            include: None,
            analysis: None,
            metrics: None,
            granularity: None,
            max_results: None,
            confidence_threshold: None,
            focus: None,
            target: None,
            languages: None,
            git: None,
            extra: Default::default(),
        })),
    )
    .await
    .expect("must answer within 5s, not stall for 120s");

    let text = text_of(outcome.unwrap());
    assert!(text.contains("\"error\""));
    assert!(text.contains("not_ready"));
}

/// Scenario 4: `count` output is exactly the two-line LCF shape.
#[tokio::test]
async fn scenario_four_count_output_is_exact_shape() {
    let (_dir, server) = server_over(&[(
        "service.rs",
        "struct Service;\n\nimpl Service {\n    pub fn process(&self) {}\n}\n\nfn main() {\n    let s = Service;\n    s.process();\n}\n",
    )])
    .await;

    let result = server
        .search(Parameters(SearchRequest {
            pattern: "process".to_string(),
            flags: None,
            symbol_types: None,
            include: None,
            output: Some("count".to_string()),
            max: None,
            semantic: false,
            extra: Default::default(),
        }))
        .await
        .unwrap();
    let text = text_of(result);
    assert!(text.starts_with("LCF/1.0 mode=count\n"));
    assert!(text.contains("files=1"));
}

/// Scenario 5: fuzzy + stemming finds a divergent literal.
#[tokio::test]
async fn scenario_five_semantic_search_finds_divergent_literal() {
    let (_dir, server) = server_over(&[(
        "auth.rs",
        "pub fn SignInHandler() {}\n\nfn main() {\n    SignInHandler();\n}\n",
    )])
    .await;

    let result = server
        .search(Parameters(SearchRequest {
            pattern: "signin".to_string(),
            flags: None,
            symbol_types: None,
            include: None,
            output: None,
            max: None,
            semantic: true,
            extra: Default::default(),
        }))
        .await
        .unwrap();
    let text = text_of(result);
    assert!(text.contains("SignInHandler"));
}

/// Boundary: `max > 500` is clamped, never rejected.
#[tokio::test]
async fn max_above_hard_cap_never_errors() {
    let (_dir, server) = server_over(&[("a.rs", "fn alpha() {}\n")]).await;
    let result = server
        .search(Parameters(SearchRequest {
            pattern: "alpha".to_string(),
            flags: None,
            symbol_types: None,
            include: None,
            output: None,
            max: Some(10_000),
            semantic: false,
            extra: Default::default(),
        }))
        .await
        .unwrap();
    let text = text_of(result);
    assert!(!text.contains("\"error\""));
}
