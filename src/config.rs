//! Layered configuration — spec §6.
//!
//! Defaults -> TOML file -> `CI_*` environment overrides, the same
//! `figment` layering the teacher's `src/config.rs` uses. The KDL front-end
//! named in spec.md is an external loader this core doesn't implement;
//! callers hand this module a `Settings` value however they obtained it.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_project_name")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_total_size_mb")]
    pub max_total_size_mb: u64,
    #[serde(default = "default_max_file_count")]
    pub max_file_count: usize,
    #[serde(default = "default_true")]
    pub follow_symlinks: bool,
    #[serde(default = "default_true")]
    pub smart_size_control: bool,
    #[serde(default = "default_priority_mode")]
    pub priority_mode: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u64,
    #[serde(default = "default_worker_count")]
    pub max_goroutines: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_indexing_timeout_sec")]
    pub indexing_timeout_sec: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_max_context_lines")]
    pub max_context_lines: usize,
    #[serde(default = "default_true")]
    pub enable_fuzzy: bool,
    #[serde(default = "default_false")]
    pub merge_file_results: bool,
    #[serde(default = "default_true")]
    pub ensure_complete_stmt: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_project_name() -> String {
    "project".to_string()
}
fn default_max_file_size() -> u64 {
    1024 * 1024
}
fn default_max_total_size_mb() -> u64 {
    500
}
fn default_max_file_count() -> usize {
    50_000
}
fn default_priority_mode() -> String {
    "balanced".to_string()
}
fn default_max_memory_mb() -> u64 {
    1024
}
fn default_worker_count() -> usize {
    num_cpus::get().min(4)
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_indexing_timeout_sec() -> u64 {
    120
}
fn default_max_results() -> usize {
    50
}
fn default_max_context_lines() -> usize {
    30
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_include() -> Vec<String> {
    Vec::new()
}
fn default_exclude() -> Vec<String> {
    [
        "target/**",
        "node_modules/**",
        ".git/**",
        "dist/**",
        "build/**",
        "vendor/**",
        "__pycache__/**",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            name: default_project_name(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_total_size_mb: default_max_total_size_mb(),
            max_file_count: default_max_file_count(),
            follow_symlinks: false,
            smart_size_control: true,
            priority_mode: default_priority_mode(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: default_max_memory_mb(),
            max_goroutines: default_worker_count(),
            debounce_ms: default_debounce_ms(),
            indexing_timeout_sec: default_indexing_timeout_sec(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            max_context_lines: default_max_context_lines(),
            enable_fuzzy: true,
            merge_file_results: false,
            ensure_complete_stmt: true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            index: IndexConfig::default(),
            performance: PerformanceConfig::default(),
            search: SearchConfig::default(),
            include: default_include(),
            exclude: default_exclude(),
        }
    }
}

impl Settings {
    pub fn load(config_path: Option<&std::path::Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("CI_").split("__"));
        figment.extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_populate_every_section() {
        let settings = Settings::default();
        assert_eq!(settings.search.max_results, 50);
        assert!(settings.exclude.iter().any(|p| p == "target/**"));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let settings = Settings::load(None).expect("defaults always extract");
        assert_eq!(settings.performance.debounce_ms, 300);
    }

    #[test]
    fn env_override_applies() {
        unsafe {
            std::env::set_var("CI_SEARCH__MAX_RESULTS", "99");
        }
        let settings = Settings::load(None).expect("env override extracts");
        assert_eq!(settings.search.max_results, 99);
        unsafe {
            std::env::remove_var("CI_SEARCH__MAX_RESULTS");
        }
    }
}
