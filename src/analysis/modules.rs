//! Module boundary analysis — spec §4.5. Files are grouped by containing
//! directory ("package"); the package dependency graph is derived from the
//! reference tracker by classifying each edge as internal (both endpoints
//! in the same package) or cross-package.

use crate::indexing::MasterIndex;
use crate::types::SymbolId;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PackageMetrics {
    pub package: String,
    pub symbol_count: usize,
    /// Internal connections / total connections originating in this
    /// package; undefined (package has no outgoing edges) defaults to 0.5.
    pub cohesion: f64,
    /// Efferent coupling normalized against a heuristic possible-edge
    /// count (`10 * symbols`), clamped to 1.0.
    pub efferent_coupling: f64,
    /// Raw afferent / (afferent + efferent) coupling counts; an isolated
    /// package (no edges either direction) defaults to 0.5.
    pub stability: f64,
}

fn package_of(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => ".".to_string(),
    }
}

#[derive(Default)]
struct PackageAgg {
    symbols: usize,
    internal: usize,
    efferent_raw: usize,
    afferent_raw: usize,
}

pub fn analyze_packages(index: &MasterIndex) -> Vec<PackageMetrics> {
    let files = index.get_all_files();

    let mut symbol_package: HashMap<SymbolId, String> = HashMap::new();
    let mut package_symbol_count: HashMap<String, usize> = HashMap::new();
    for file in &files {
        let package = package_of(&file.path);
        for symbol in &file.symbols {
            symbol_package.insert(symbol.id, package.clone());
        }
        *package_symbol_count.entry(package).or_default() += file.symbols.len();
    }

    let mut aggs: HashMap<String, PackageAgg> = HashMap::new();
    for (package, count) in &package_symbol_count {
        aggs.entry(package.clone()).or_default().symbols = *count;
    }

    for file in &files {
        for symbol in &file.symbols {
            let Some(source_package) = symbol_package.get(&symbol.id) else {
                continue;
            };
            for edge in index.tracker().outgoing_for(symbol.id) {
                let Some(target_package) = symbol_package.get(&edge.target) else {
                    continue;
                };
                if target_package == source_package {
                    aggs.entry(source_package.clone()).or_default().internal += 1;
                } else {
                    aggs.entry(source_package.clone()).or_default().efferent_raw += 1;
                    aggs.entry(target_package.clone()).or_default().afferent_raw += 1;
                }
            }
        }
    }

    let mut out: Vec<PackageMetrics> = aggs
        .into_iter()
        .map(|(package, agg)| {
            let total = agg.internal + agg.efferent_raw;
            let cohesion = if total == 0 {
                0.5
            } else {
                agg.internal as f64 / total as f64
            };
            let possible = (10 * agg.symbols.max(1)) as f64;
            let efferent_coupling = (agg.efferent_raw as f64 / possible).min(1.0);
            let stability = if agg.afferent_raw == 0 && agg.efferent_raw == 0 {
                0.5
            } else {
                agg.afferent_raw as f64 / (agg.afferent_raw + agg.efferent_raw) as f64
            };
            PackageMetrics {
                package,
                symbol_count: agg.symbols,
                cohesion,
                efferent_coupling,
                stability,
            }
        })
        .collect();
    out.sort_by(|a, b| a.package.cmp(&b.package));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_of_splits_on_last_path_separator() {
        assert_eq!(package_of("src/analysis/modules.rs"), "src/analysis");
        assert_eq!(package_of("main.rs"), ".");
    }

    #[test]
    fn isolated_package_gets_neutral_metrics() {
        let index = MasterIndex::new(1, 1024);
        let packages = analyze_packages(&index);
        assert!(packages.is_empty());
        index.shutdown();
    }
}
