//! Cyclomatic complexity distribution — spec §4.5.

use crate::symbol::{ComplexityBucket, EnhancedSymbol};

#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityDistribution {
    pub simple: usize,
    pub moderate: usize,
    pub high: usize,
    pub very_high: usize,
    pub average: f64,
    pub max: u32,
}

pub fn distribution(symbols: &[EnhancedSymbol]) -> ComplexityDistribution {
    let mut dist = ComplexityDistribution::default();
    if symbols.is_empty() {
        return dist;
    }

    let mut total = 0u64;
    for symbol in symbols {
        total += symbol.cyclomatic_complexity as u64;
        dist.max = dist.max.max(symbol.cyclomatic_complexity);
        match symbol.complexity_bucket() {
            ComplexityBucket::Simple => dist.simple += 1,
            ComplexityBucket::Moderate => dist.moderate += 1,
            ComplexityBucket::High => dist.high += 1,
            ComplexityBucket::VeryHigh => dist.very_high += 1,
        }
    }
    dist.average = total as f64 / symbols.len() as f64;
    dist
}

/// The `n` symbols with the highest cyclomatic complexity, ties broken by
/// name for a stable ordering.
pub fn most_complex(symbols: &[EnhancedSymbol], n: usize) -> Vec<EnhancedSymbol> {
    let mut sorted: Vec<EnhancedSymbol> = symbols.to_vec();
    sorted.sort_by(|a, b| {
        b.cyclomatic_complexity
            .cmp(&a.cyclomatic_complexity)
            .then_with(|| a.name.cmp(&b.name))
    });
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileId, Range, SymbolId, SymbolKind};

    fn sym(id: u32, complexity: u32) -> EnhancedSymbol {
        EnhancedSymbol::new(
            SymbolId::new(id).unwrap(),
            format!("fn{id}"),
            SymbolKind::Function,
            FileId::new(1).unwrap(),
            Range::new(0, 0, 1, 0),
        )
        .with_complexity(complexity)
    }

    #[test]
    fn distribution_buckets_match_thresholds() {
        let symbols = vec![sym(1, 5), sym(2, 12), sym(3, 18), sym(4, 25)];
        let dist = distribution(&symbols);
        assert_eq!(dist.simple, 1);
        assert_eq!(dist.moderate, 1);
        assert_eq!(dist.high, 1);
        assert_eq!(dist.very_high, 1);
        assert_eq!(dist.max, 25);
    }

    #[test]
    fn most_complex_sorts_descending() {
        let symbols = vec![sym(1, 5), sym(2, 20), sym(3, 10)];
        let top = most_complex(&symbols, 2);
        assert_eq!(top[0].cyclomatic_complexity, 20);
        assert_eq!(top[1].cyclomatic_complexity, 10);
    }
}
