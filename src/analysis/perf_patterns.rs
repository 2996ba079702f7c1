//! Performance anti-pattern detection — spec §4.5, §8 scenario 6.
//! Requires perf-data; a file with no perf-data emits no patterns.

use crate::indexing::file_info::PerfData;
use crate::types::Range;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternKind {
    SequentialAwaits,
    NestedLoops,
    ExpensiveCallInLoop,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternKind,
    pub range: Range,
    pub detail: String,
    /// Set only for `SequentialAwaits`: how many awaits in the group could
    /// run concurrently instead.
    pub parallelizable_count: Option<usize>,
}

pub fn detect(perf: &PerfData) -> Vec<Pattern> {
    if perf.is_empty() {
        return Vec::new();
    }

    let mut patterns = Vec::new();

    let mut groups: HashMap<u32, Vec<Range>> = HashMap::new();
    for site in &perf.awaits {
        groups.entry(site.sequential_group).or_default().push(site.range);
    }
    for (_, ranges) in groups {
        if ranges.len() >= 2 {
            let first = ranges[0];
            patterns.push(Pattern {
                kind: PatternKind::SequentialAwaits,
                range: first,
                detail: format!("{} independent awaits run sequentially", ranges.len()),
                parallelizable_count: Some(ranges.len()),
            });
        }
    }

    for site in &perf.loops {
        if site.depth >= 1 {
            patterns.push(Pattern {
                kind: PatternKind::NestedLoops,
                range: site.range,
                detail: format!("loop nested at depth {}", site.depth),
                parallelizable_count: None,
            });
        }
    }

    for call in &perf.calls {
        if call.allocates && call.loop_depth >= 1 {
            patterns.push(Pattern {
                kind: PatternKind::ExpensiveCallInLoop,
                range: call.range,
                detail: format!("{} allocates inside a loop (depth {})", call.callee_name, call.loop_depth),
                parallelizable_count: None,
            });
        }
    }

    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::file_info::AwaitSite;

    #[test]
    fn two_independent_awaits_in_the_same_group_yield_one_pattern() {
        let perf = PerfData {
            loops: Vec::new(),
            calls: Vec::new(),
            awaits: vec![
                AwaitSite { range: Range::new(1, 0, 1, 10), sequential_group: 0 },
                AwaitSite { range: Range::new(2, 0, 2, 10), sequential_group: 0 },
            ],
        };
        let patterns = detect(&perf);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].kind, PatternKind::SequentialAwaits);
        assert_eq!(patterns[0].parallelizable_count, Some(2));
    }

    #[test]
    fn empty_perf_data_yields_no_patterns() {
        assert!(detect(&PerfData::default()).is_empty());
    }
}
