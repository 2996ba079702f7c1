//! Git-aware change analysis — spec §4.6, `git_analysis` tool. Process
//! invocation of `git` itself is an external collaborator (spec §1); this
//! module defines the `GitProvider` seam and one concrete implementation
//! that shells out, grounded on the teacher pack's `ChurnAnalyzer`
//! (`examples/bobamatcha-omni/src/analysis/churn.rs`) for the
//! `Command::new("git")` + `anyhow::Context` style.

use crate::error::ToolError;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitScope {
    Staged,
    Wip,
    Commit,
    Range,
}

impl GitScope {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "staged" => Self::Staged,
            "wip" => Self::Wip,
            "commit" => Self::Commit,
            "range" => Self::Range,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GitAnalysisParams {
    pub scope: GitScope,
    pub base_ref: Option<String>,
    pub target_ref: Option<String>,
    pub focus: Option<String>,
    pub similarity_threshold: f32,
    pub max_findings: usize,
}

impl GitAnalysisParams {
    pub fn new(scope: GitScope) -> Self {
        Self {
            scope,
            base_ref: None,
            target_ref: None,
            focus: None,
            similarity_threshold: 0.5,
            max_findings: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: String,
    pub renamed_from: Option<String>,
    pub kind: ChangeKind,
    pub lines_added: u32,
    pub lines_removed: u32,
    pub similarity: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct GitAnalysis {
    pub changes: Vec<FileChange>,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct Hotspot {
    pub path: String,
    pub commits: u32,
}

pub trait GitProvider: Send + Sync {
    fn is_repo(&self, root: &Path) -> bool;
    fn changes(&self, root: &Path, params: &GitAnalysisParams) -> Result<GitAnalysis, ToolError>;
    fn hotspots(&self, root: &Path, days: u32) -> Result<Vec<Hotspot>, ToolError>;
}

/// Shells out to the system `git` binary. Every failure (missing repo,
/// bad ref, git not on PATH) maps to `ExternalFailure` per spec §7 — git
/// invocation is this module's only external collaborator.
pub struct ProcessGitProvider;

impl ProcessGitProvider {
    fn run(&self, root: &Path, args: &[&str]) -> Result<String, ToolError> {
        run_git(root, args).map_err(|e| ToolError::ExternalFailure {
            operation: format!("git {}", args.join(" ")),
            reason: e.to_string(),
        })
    }
}

fn run_git(root: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .context("failed to execute git")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl GitProvider for ProcessGitProvider {
    fn is_repo(&self, root: &Path) -> bool {
        run_git(root, &["rev-parse", "--git-dir"]).is_ok()
    }

    fn changes(&self, root: &Path, params: &GitAnalysisParams) -> Result<GitAnalysis, ToolError> {
        if !self.is_repo(root) {
            return Err(ToolError::ExternalFailure {
                operation: "git_analysis".to_string(),
                reason: format!("{} is not a git repository", root.display()),
            });
        }

        let similarity_pct = (params.similarity_threshold.clamp(0.0, 1.0) * 100.0).round() as u32;
        let rename_flag = format!("-M{similarity_pct}%");

        let diff_args: Vec<String> = match params.scope {
            GitScope::Staged => vec!["diff".into(), "--cached".into(), "--numstat".into(), rename_flag],
            GitScope::Wip => vec!["diff".into(), "--numstat".into(), rename_flag],
            GitScope::Commit => {
                let target = params.target_ref.as_deref().unwrap_or("HEAD");
                vec!["show".into(), target.into(), "--numstat".into(), "--format=".into(), rename_flag]
            }
            GitScope::Range => {
                let base = params.base_ref.as_deref().unwrap_or("HEAD~1");
                let target = params.target_ref.as_deref().unwrap_or("HEAD");
                vec!["diff".into(), format!("{base}..{target}"), "--numstat".into(), rename_flag]
            }
        };
        let args: Vec<&str> = diff_args.iter().map(String::as_str).collect();
        let stdout = self.run(root, &args)?;

        let mut changes = parse_numstat(&stdout);
        if let Some(focus) = &params.focus {
            changes.retain(|c| c.path.contains(focus.as_str()));
        }

        let truncated = changes.len() > params.max_findings;
        changes.truncate(params.max_findings);

        Ok(GitAnalysis { changes, truncated })
    }

    fn hotspots(&self, root: &Path, days: u32) -> Result<Vec<Hotspot>, ToolError> {
        if !self.is_repo(root) {
            return Err(ToolError::ExternalFailure {
                operation: "git_analysis".to_string(),
                reason: format!("{} is not a git repository", root.display()),
            });
        }
        let since = format!("{days} days ago");
        let stdout = self.run(root, &["log", "--since", &since, "--pretty=format:", "--name-only"])?;

        let mut counts: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            *counts.entry(line.trim().to_string()).or_default() += 1;
        }
        let mut hotspots: Vec<Hotspot> = counts.into_iter().map(|(path, commits)| Hotspot { path, commits }).collect();
        hotspots.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.path.cmp(&b.path)));
        Ok(hotspots)
    }
}

/// Parses `git diff --numstat` lines: `added\tremoved\tpath` or, for a
/// detected rename, `added\tremoved\told => new` / `{old => new}/rest`.
fn parse_numstat(stdout: &str) -> Vec<FileChange> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let added = parts.next()?;
            let removed = parts.next()?;
            let path_field = parts.next()?;

            let (path, renamed_from) = split_rename(path_field);
            let lines_added = added.parse().unwrap_or(0);
            let lines_removed = removed.parse().unwrap_or(0);
            let kind = if renamed_from.is_some() {
                ChangeKind::Renamed
            } else if lines_removed == 0 && lines_added > 0 {
                ChangeKind::Added
            } else if lines_added == 0 && lines_removed > 0 {
                ChangeKind::Deleted
            } else {
                ChangeKind::Modified
            };

            Some(FileChange {
                path,
                renamed_from,
                kind,
                lines_added,
                lines_removed,
                similarity: None,
            })
        })
        .collect()
}

fn split_rename(field: &str) -> (String, Option<String>) {
    if let Some(brace_start) = field.find('{') {
        if let Some(arrow) = field.find(" => ") {
            if let Some(brace_end) = field.find('}') {
                let prefix = &field[..brace_start];
                let old = &field[brace_start + 1..arrow];
                let new = &field[arrow + 4..brace_end];
                let suffix = &field[brace_end + 1..];
                return (format!("{prefix}{new}{suffix}"), Some(format!("{prefix}{old}{suffix}")));
            }
        }
    }
    if let Some(arrow) = field.find(" => ") {
        let old = field[..arrow].trim();
        let new = field[arrow + 4..].trim();
        return (new.to_string(), Some(old.to_string()));
    }
    (field.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        for args in [vec!["init"], vec!["config", "user.name", "t"], vec!["config", "user.email", "t@t.com"]] {
            Command::new("git").args(&args).current_dir(dir.path()).output().unwrap();
        }
        dir
    }

    fn commit_all(dir: &Path, message: &str) {
        Command::new("git").args(["add", "-A"]).current_dir(dir).output().unwrap();
        Command::new("git").args(["commit", "-m", message]).current_dir(dir).output().unwrap();
    }

    #[test]
    fn detects_staged_additions() {
        let dir = init_repo();
        fs::write(dir.path().join("a.txt"), "line one\n").unwrap();
        commit_all(dir.path(), "init");

        fs::write(dir.path().join("b.txt"), "line one\nline two\n").unwrap();
        Command::new("git").args(["add", "-A"]).current_dir(dir.path()).output().unwrap();

        let provider = ProcessGitProvider;
        let params = GitAnalysisParams::new(GitScope::Staged);
        let analysis = provider.changes(dir.path(), &params).unwrap();
        assert_eq!(analysis.changes.len(), 1);
        assert_eq!(analysis.changes[0].kind, ChangeKind::Added);
        assert_eq!(analysis.changes[0].lines_added, 2);
    }

    #[test]
    fn non_repo_directory_is_an_external_failure() {
        let dir = TempDir::new().unwrap();
        let provider = ProcessGitProvider;
        let params = GitAnalysisParams::new(GitScope::Wip);
        let err = provider.changes(dir.path(), &params).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ExternalFailure);
    }

    #[test]
    fn parse_numstat_recognizes_modified_files() {
        let changes = parse_numstat("3\t1\tsrc/main.rs\n");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
    }

    #[test]
    fn parse_numstat_recognizes_simple_rename() {
        let changes = parse_numstat("0\t0\told.rs => new.rs\n");
        assert_eq!(changes[0].path, "new.rs");
        assert_eq!(changes[0].renamed_from.as_deref(), Some("old.rs"));
    }
}
