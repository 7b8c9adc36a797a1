//! Changelog generation between two revisions of the tracking repository.
//!
//! The tracking repository pins one commit per service. Given two revisions
//! of it, [`Changelog::generate`] reads the service snapshot at each, groups
//! the services whose pin moved by source repository, brings a local clone of
//! each of those up to date and renders the commits in between.
//!
//! The old/new checkout happens in the tracking repository's own working
//! tree, so the branch that was checked out is restored before `generate`
//! returns, whether it succeeds or not.

mod render;

pub use render::{
    COMMIT_LOG_FORMAT, ChangelogEntry, Commit, Format, HTML, MARKDOWN, PLAIN, Report,
    ReportHeader, SHORT_HASH_LEN, Template, escape_html, render, short_rev,
};

use crate::error::{HerderError, Result};
use crate::git::{self, GitRunner};
use crate::snapshot::{ServiceSnapshot, SnapshotSource};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};


/// Default directory for per-service clones.
pub const DEFAULT_WORKSPACE: &str = "_workspace";

/// Services of one source repository whose pinned hash changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDiff {
    /// Service names, in the order they were encountered
    pub names: Vec<String>,
    /// Repository URL without trailing slash
    pub url: String,
    pub old_hash: String,
    pub new_hash: String,
}

impl ServiceDiff {
    /// Name the worktree is cloned under.
    pub fn worktree_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }
}

/// Strips trailing slashes from a repository URL.
pub fn normalize_url(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Turns a git remote into a browsable https URL.
///
/// ```
/// use libherder::changelog::https_url;
///
/// assert_eq!(
///     https_url("git@github.com:openshiftio/saas-openshiftio.git"),
///     "https://github.com/openshiftio/saas-openshiftio"
/// );
/// ```
pub fn https_url(remote: &str) -> String {
    let remote = remote.trim();
    let remote = remote.strip_suffix(".git").unwrap_or(remote);

    let url = if let Some(rest) = remote.strip_prefix("git@") {
        format!("https://{}", rest.replacen(':', "/", 1))
    } else if let Some(rest) = remote.strip_prefix("ssh://") {
        let rest = rest.split_once('@').map_or(rest, |(_, host)| host);
        format!("https://{}", rest)
    } else if let Some(rest) = remote.strip_prefix("http://") {
        format!("https://{}", rest)
    } else {
        remote.to_string()
    };
    normalize_url(&url).to_string()
}

/// Compares two snapshots.
///
/// Walks `now` in order; services absent from `previous`, or with a missing
/// hash on either side, are skipped. Changed services sharing a normalized
/// URL collapse into one entry carrying the first service's hash pair.
pub fn fetch_diff(previous: &ServiceSnapshot, now: &ServiceSnapshot) -> Vec<ServiceDiff> {
    let mut diffs: Vec<ServiceDiff> = Vec::new();

    for service in now.iter() {
        let Some(old) = previous.get(&service.name) else {
            continue;
        };
        let (Some(old_hash), Some(new_hash)) = (old.hash.as_deref(), service.hash.as_deref())
        else {
            continue;
        };
        if old_hash == new_hash {
            continue;
        }

        let url = normalize_url(&service.url);
        match diffs.iter_mut().find(|d| d.url == url) {
            Some(diff) => {
                if diff.old_hash != old_hash || diff.new_hash != new_hash {
                    warn!(
                        url,
                        service = %service.name,
                        kept = %format!("{}..{}", diff.old_hash, diff.new_hash),
                        ignored = %format!("{}..{}", old_hash, new_hash),
                        "services sharing a repository have diverged hashes"
                    );
                }
                diff.names.push(service.name.clone());
            }
            None => diffs.push(ServiceDiff {
                names: vec![service.name.clone()],
                url: url.to_string(),
                old_hash: old_hash.to_string(),
                new_hash: new_hash.to_string(),
            }),
        }
    }

    diffs
}

/// Interprets `revision` as a date, returning it in a form `git --before` accepts.
pub fn parse_revision_date(revision: &str) -> Option<String> {
    let s = revision.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.to_rfc3339());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.to_rfc3339());
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%b %d %Y"];

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })?;
    Some(naive.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Builds changelogs for one tracking repository.
pub struct Changelog<R, S> {
    runner: R,
    source: S,
    repo: PathBuf,
    workspace: PathBuf,
}

impl<R: GitRunner, S: SnapshotSource> Changelog<R, S> {
    /// `repo` is the tracking repository; clones go under `repo/_workspace`.
    pub fn new(runner: R, source: S, repo: impl Into<PathBuf>) -> Self {
        let repo = repo.into();
        let workspace = repo.join(DEFAULT_WORKSPACE);
        Self {
            runner,
            source,
            repo,
            workspace,
        }
    }

    /// Places worktrees under `workspace` instead.
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolves a date to the last commit before it; anything else is returned as is.
    pub async fn resolve_revision(&self, revision: &str) -> Result<String> {
        let Some(date) = parse_revision_date(revision) else {
            return Ok(revision.to_string());
        };
        match git::rev_before(&self.runner, &self.repo, &date).await? {
            Some(hash) => {
                debug!(revision, %hash, "resolved date to commit");
                Ok(hash)
            }
            None => Err(HerderError::AmbiguousDate {
                date: revision.to_string(),
            }),
        }
    }

    /// Reads the snapshots at `old` and `new`, then restores the original checkout.
    pub async fn snapshots(&self, old: &str, new: &str) -> Result<(ServiceSnapshot, ServiceSnapshot)> {
        let original = git::current_branch(&self.runner, &self.repo).await?;
        info!(branch = %original, "on branch before generating changelog");

        let mut guard = RestoreGuard {
            runner: &self.runner,
            repo: &self.repo,
            original: &original,
            armed: true,
        };
        let result = self.read_snapshots(old, new).await;

        let restored = git::checkout(&self.runner, &self.repo, &original).await;
        guard.armed = false;

        match (result, restored) {
            (Ok(snapshots), Ok(())) => Ok(snapshots),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore)) => {
                warn!(error = %restore, branch = %original, "failed to restore branch");
                Err(e)
            }
        }
    }

    async fn read_snapshots(&self, old: &str, new: &str) -> Result<(ServiceSnapshot, ServiceSnapshot)> {
        git::checkout(&self.runner, &self.repo, old).await?;
        let previous = self.source.load_service_snapshot(old)?;

        git::checkout(&self.runner, &self.repo, new).await?;
        let now = self.source.load_service_snapshot(new)?;

        Ok((previous, now))
    }

    /// Clones or fetches the worktree of every diff, then checks out its new hash.
    pub async fn update_worktrees(&self, diffs: &[ServiceDiff]) -> Result<()> {
        if diffs.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.workspace)
            .map_err(|e| HerderError::io(self.workspace.display(), e))?;

        futures::future::try_join_all(diffs.iter().map(|diff| self.update_worktree(diff))).await?;
        Ok(())
    }

    async fn update_worktree(&self, diff: &ServiceDiff) -> Result<()> {
        let name = diff.worktree_name();
        let worktree = self.workspace.join(name);

        if worktree.exists() {
            info!(service = name, "found git worktree, updating");
            git::fetch(&self.runner, &worktree).await?;
        } else {
            info!(service = name, url = %diff.url, "cloning git worktree");
            git::clone(&self.runner, &self.workspace, &diff.url, name).await?;
        }
        git::checkout(&self.runner, &worktree, &diff.new_hash).await
    }

    /// Extracts the commit date and the commits of one diff.
    pub async fn entry(&self, diff: &ServiceDiff) -> Result<ChangelogEntry> {
        let worktree = self.workspace.join(diff.worktree_name());
        let last_updated = git::commit_date(&self.runner, &worktree, &diff.new_hash).await?;
        let commits = git::log_range(
            &self.runner,
            &worktree,
            COMMIT_LOG_FORMAT,
            &diff.new_hash,
            &diff.old_hash,
        )
        .await?
        .iter()
        .filter_map(|line| {
            let commit = Commit::parse(line);
            if commit.is_none() {
                warn!(line = %line, "skipping unparsable git log line");
            }
            commit
        })
        .collect();

        Ok(ChangelogEntry {
            diff: diff.clone(),
            last_updated,
            commits,
        })
    }

    /// Builds the report data without rendering it.
    pub async fn report(&mut self, context: Option<&str>, old: &str, new: &str) -> Result<Report> {
        let old = self.resolve_revision(old).await?;
        let new = self.resolve_revision(new).await?;

        if let Some(context) = context {
            self.source.switch_context(context)?;
        }
        info!(old = %old, new = %new, "generating changelog");

        let (previous, now) = self.snapshots(&old, &new).await?;
        let diffs = fetch_diff(&previous, &now);
        info!(changed = diffs.len(), "repositories changed");

        self.update_worktrees(&diffs).await?;

        let mut entries = Vec::with_capacity(diffs.len());
        for diff in &diffs {
            entries.push(self.entry(diff).await?);
        }

        let url = git::remote_url(&self.runner, &self.repo)
            .await?
            .map(|remote| https_url(&remote))
            .unwrap_or_else(|| self.repo.display().to_string());

        Ok(Report {
            header: ReportHeader { url, old, new },
            entries,
        })
    }

    /// Generates the changelog between `old` and `new` in `format`.
    pub async fn generate(
        &mut self,
        context: Option<&str>,
        old: &str,
        new: &str,
        format: Format,
    ) -> Result<String> {
        let report = self.report(context, old, new).await?;
        Ok(render(&report, format.template()))
    }
}

/// Checks the original branch back out if dropped while armed, which only
/// happens when the generating future is dropped mid-checkout.
struct RestoreGuard<'a, R: GitRunner> {
    runner: &'a R,
    repo: &'a Path,
    original: &'a str,
    armed: bool,
}

impl<R: GitRunner> Drop for RestoreGuard<'_, R> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(branch = self.original, "changelog interrupted, restoring branch");
        if let Err(e) = git::run_blocking(self.runner, self.repo, &["checkout", self.original]) {
            warn!(error = %e, "failed to restore branch");
        }
    }
}
