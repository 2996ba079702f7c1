//! LCF (LCI Compact Format) builder — spec §4.7. Line-oriented, `---`
//! section separators, short `key=value` attributes; every response is
//! built incrementally so the header/section contract can't drift from
//! one tool handler to the next.

use crate::search::truncate;

/// Accumulates an LCF document: `LCF/1.0`, a mode/tier line, then zero or
/// more `== NAME ==` ... `---` sections.
pub struct LcfBuilder {
    buf: String,
}

impl LcfBuilder {
    pub fn new(mode_line: impl AsRef<str>) -> Self {
        let mut buf = String::from("LCF/1.0\n");
        buf.push_str(mode_line.as_ref());
        buf.push('\n');
        Self { buf }
    }

    pub fn section(&mut self, name: &str) -> &mut Self {
        self.buf.push_str("== ");
        self.buf.push_str(name);
        self.buf.push_str(" ==\n");
        self
    }

    pub fn kv(&mut self, key: &str, value: impl std::fmt::Display) -> &mut Self {
        self.buf.push_str(key);
        self.buf.push('=');
        self.buf.push_str(&value.to_string());
        self.buf.push('\n');
        self
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.buf.push_str(text.as_ref());
        self.buf.push('\n');
        self
    }

    /// Emits at most `cap` items from `items`, each via `render`, then a
    /// `+N more` marker if more were dropped (spec §4.7's top-N
    /// truncation of inner lists).
    pub fn top_n<T>(&mut self, items: &[T], cap: usize, render: impl Fn(&T) -> String) -> &mut Self {
        for item in items.iter().take(cap) {
            self.buf.push_str(&render(item));
            self.buf.push('\n');
        }
        if items.len() > cap {
            self.buf.push_str(&format!("+{} more\n", items.len() - cap));
        }
        self
    }

    /// Closes the most recently opened section.
    pub fn end_section(&mut self) -> &mut Self {
        self.buf.push_str("---\n");
        self
    }

    /// Truncates `text` to the given byte budget via the search module's
    /// shared truncation contract before appending it as a raw line.
    pub fn truncated_line(&mut self, text: &str, budget: usize) -> &mut Self {
        self.line(truncate(text, budget))
    }

    pub fn build(self) -> String {
        self.buf
    }
}

pub const TOP_N_SMALL: usize = 3;
pub const TOP_N_MEDIUM: usize = 5;
pub const TOP_N_LARGE: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_always_lcf_1_0_and_has_a_separator() {
        let mut b = LcfBuilder::new("mode=summary");
        b.section("HEALTH").kv("files", 3).end_section();
        let out = b.build();
        assert!(out.starts_with("LCF/1.0\n"));
        assert!(out.contains("---\n"));
    }

    #[test]
    fn top_n_emits_a_more_marker_when_truncated() {
        let mut b = LcfBuilder::new("mode=overview");
        b.top_n(&[1, 2, 3, 4, 5], 3, |n| n.to_string());
        let out = b.build();
        assert!(out.contains("+2 more"));
    }
}
