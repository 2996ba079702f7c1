//! File system walker — spec §4.1 ("Start(root)"). Honors include/exclude
//! globs, size/count caps, and symlink policy, grounded on the teacher's
//! `ignore`-crate-backed `FileWalker`.

use crate::config::Settings;
use crate::indexing::file_info::Language;
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use std::path::{Path, PathBuf};

pub struct FileWalker<'a> {
    settings: &'a Settings,
}

#[derive(Debug, Default)]
pub struct WalkStats {
    pub candidates: usize,
    pub skipped_too_large: usize,
    pub skipped_unsupported: usize,
}

impl<'a> FileWalker<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn walk(&self, root: &Path) -> (Vec<PathBuf>, WalkStats) {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(self.settings.index.follow_symlinks)
            .require_git(false);

        let mut overrides = OverrideBuilder::new(root);
        for pattern in &self.settings.exclude {
            let _ = overrides.add(&format!("!{pattern}"));
        }
        for pattern in &self.settings.include {
            let _ = overrides.add(pattern);
        }
        if let Ok(built) = overrides.build() {
            builder.overrides(built);
        }

        let mut stats = WalkStats::default();
        let mut out = Vec::new();

        for entry in builder.build().filter_map(Result::ok) {
            if out.len() >= self.settings.index.max_file_count {
                break;
            }
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();

            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if Language::from_extension(ext).is_none() {
                stats.skipped_unsupported += 1;
                continue;
            }

            if let Ok(meta) = entry.metadata() {
                if meta.len() > self.settings.index.max_file_size {
                    stats.skipped_too_large += 1;
                    continue;
                }
            }

            stats.candidates += 1;
            out.push(path.to_path_buf());
        }

        (out, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn walk_finds_supported_files_and_skips_excluded_dirs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("readme.md"), "# hi").unwrap();
        fs::create_dir(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("target/generated.rs"), "// generated").unwrap();

        let settings = Settings::default();
        let (files, stats) = FileWalker::new(&settings).walk(dir.path());

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.rs"));
        assert_eq!(stats.candidates, 1);
    }

    #[test]
    fn walk_skips_files_over_the_size_cap() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("big.py"), "x".repeat(64)).unwrap();

        let mut settings = Settings::default();
        settings.index.max_file_size = 10;
        let (files, stats) = FileWalker::new(&settings).walk(dir.path());

        assert!(files.is_empty());
        assert_eq!(stats.skipped_too_large, 1);
    }
}
