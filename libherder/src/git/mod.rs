//! Git invoked as an external process.
//!
//! Commands are argument vectors run in an explicit working directory; no
//! shell is involved. [`GitRunner`] is the seam the changelog engine is
//! generic over.

use crate::error::{HerderError, Result};
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};


/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful output carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with `code` and `stderr`.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs git.
pub trait GitRunner: Sync {
    /// Runs `git <args>` in `cwd`. A non-zero exit is not an error here.
    fn output<'a>(
        &'a self,
        cwd: &'a Path,
        args: &'a [&'a str],
    ) -> impl Future<Output = Result<CommandOutput>> + Send + 'a;

    /// Blocking variant, for cleanup paths that cannot await.
    fn output_blocking(&self, cwd: &Path, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs the `git` executable found on `PATH` (or a given binary).
#[derive(Debug, Clone)]
pub struct SystemGit {
    binary: String,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
        }
    }
}

impl SystemGit {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn spawn_error(&self, args: &[&str], e: std::io::Error) -> HerderError {
        HerderError::git(command_line(args), None, format!("failed to run {}: {}", self.binary, e))
    }
}

fn from_process_output(output: std::process::Output) -> CommandOutput {
    CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

impl GitRunner for SystemGit {
    fn output<'a>(
        &'a self,
        cwd: &'a Path,
        args: &'a [&'a str],
    ) -> impl Future<Output = Result<CommandOutput>> + Send + 'a {
        async move {
            debug!(cwd = %cwd.display(), "Exec: {}", command_line(args));
            let output = Command::new(&self.binary)
                .args(args)
                .current_dir(cwd)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| self.spawn_error(args, e))?;
            Ok(from_process_output(output))
        }
    }

    fn output_blocking(&self, cwd: &Path, args: &[&str]) -> Result<CommandOutput> {
        debug!(cwd = %cwd.display(), "Exec (blocking): {}", command_line(args));
        let output = std::process::Command::new(&self.binary)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(args, e))?;
        Ok(from_process_output(output))
    }
}

/// Renders `args` the way a user would type them.
pub fn command_line(args: &[&str]) -> String {
    let mut line = String::from("git");
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

fn check(args: &[&str], output: CommandOutput) -> Result<String> {
    if output.success() {
        Ok(output.stdout)
    } else {
        Err(HerderError::git(
            command_line(args),
            output.code,
            output.stderr.trim(),
        ))
    }
}

/// Runs git and returns stdout, failing on a non-zero exit.
pub async fn run<R: GitRunner>(runner: &R, cwd: &Path, args: &[&str]) -> Result<String> {
    let output = runner.output(cwd, args).await?;
    check(args, output)
}

/// Blocking counterpart of [`run`].
pub fn run_blocking<R: GitRunner>(runner: &R, cwd: &Path, args: &[&str]) -> Result<String> {
    let output = runner.output_blocking(cwd, args)?;
    check(args, output)
}

/// Branch checked out in `repo`, or the short commit hash when detached.
pub async fn current_branch<R: GitRunner>(runner: &R, repo: &Path) -> Result<String> {
    let args = ["symbolic-ref", "--short", "HEAD"];
    let output = runner.output(repo, &args).await?;
    if output.success() {
        return Ok(output.stdout.trim().to_string());
    }

    warn!(
        repo = %repo.display(),
        "HEAD is detached, falling back to the commit hash"
    );
    let hash = run(runner, repo, &["rev-parse", "--short", "HEAD"]).await?;
    Ok(hash.trim().to_string())
}

pub async fn checkout<R: GitRunner>(runner: &R, repo: &Path, revision: &str) -> Result<()> {
    run(runner, repo, &["checkout", revision]).await.map(|_| ())
}

/// Last commit on HEAD at or before `date`; `None` when there is none.
pub async fn rev_before<R: GitRunner>(runner: &R, repo: &Path, date: &str) -> Result<Option<String>> {
    let before = format!("--before={}", date);
    let stdout = run(runner, repo, &["rev-list", "-1", before.as_str(), "HEAD"]).await?;
    let hash = stdout.trim();
    Ok((!hash.is_empty()).then(|| hash.to_string()))
}

/// Clones `url` into `parent/name`.
pub async fn clone<R: GitRunner>(runner: &R, parent: &Path, url: &str, name: &str) -> Result<()> {
    run(runner, parent, &["clone", url, name]).await.map(|_| ())
}

pub async fn fetch<R: GitRunner>(runner: &R, worktree: &Path) -> Result<()> {
    run(runner, worktree, &["fetch"]).await.map(|_| ())
}

/// `remote.origin.url` of `repo`, if set.
pub async fn remote_url<R: GitRunner>(runner: &R, repo: &Path) -> Result<Option<String>> {
    let args = ["config", "--get", "remote.origin.url"];
    let output = runner.output(repo, &args).await?;
    match output.code {
        Some(0) => {
            let url = output.stdout.trim();
            Ok((!url.is_empty()).then(|| url.to_string()))
        }
        // git config exits 1 when the key is missing
        Some(1) => Ok(None),
        _ => check(&args, output).map(|_| None),
    }
}

/// Committer date of `revision`.
pub async fn commit_date<R: GitRunner>(runner: &R, worktree: &Path, revision: &str) -> Result<String> {
    let stdout = run(runner, worktree, &["log", "-1", "--format=%cd", revision]).await?;
    Ok(stdout.trim().to_string())
}

/// Commits in `new...old`, one line each, formatted with `format`.
pub async fn log_range<R: GitRunner>(
    runner: &R,
    worktree: &Path,
    format: &str,
    new: &str,
    old: &str,
) -> Result<Vec<String>> {
    let format = format!("--format={}", format);
    let range = format!("{}...{}", new, old);
    let stdout = run(
        runner,
        worktree,
        &["log", "--encoding=UTF-8", format.as_str(), range.as_str()],
    )
    .await?;
    Ok(stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}
