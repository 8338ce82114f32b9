//! Commit metadata from the `git` command line.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::log::debug;

/// Source of the commit metadata of submission files.
pub trait CommitSource {
    /// Author email of the most recent commit touching `path`.
    fn author_email(&self, path: &Path) -> Option<String>;
    /// Author name of the most recent commit touching `path`.
    fn author_name(&self, path: &Path) -> Option<String>;
    /// URL of the `origin` remote.
    fn origin_url(&self) -> Option<String>;
}

pub const GIT_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs `git -C <repo_dir> ...`; each call is killed after a fixed timeout.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
    timeout: Duration,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            timeout: GIT_TIMEOUT,
        }
    }

    /// Trimmed stdout of a successful, non-empty git invocation.
    fn run(&self, args: &[&str]) -> Option<String> {
        let mut child = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| debug!("failed to spawn git: {err}"))
            .ok()?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() < deadline => std::thread::sleep(POLL_INTERVAL),
                Ok(None) => {
                    debug!("git {} timed out; killing it", args.join(" "));
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                Err(err) => {
                    debug!("failed to wait for git: {err}");
                    return None;
                }
            }
        };
        if !status.success() {
            return None;
        }

        let mut out = String::new();
        child.stdout.take()?.read_to_string(&mut out).ok()?;
        let out = out.trim();
        (!out.is_empty()).then(|| out.to_string())
    }

    /// `path` is relative to the working directory, while git resolves it
    /// against `repo_dir`, so it is made absolute first.
    fn last_commit(&self, format: &str, path: &Path) -> Option<String> {
        let path = std::fs::canonicalize(path)
            .map_err(|err| debug!("cannot resolve {path:?}: {err}"))
            .ok()?;
        let path = path.to_str()?;
        self.run(&["log", "-1", &format!("--pretty=format:{format}"), "--", path])
    }
}

impl CommitSource for GitCli {
    fn author_email(&self, path: &Path) -> Option<String> {
        self.last_commit("%ae", path)
    }

    fn author_name(&self, path: &Path) -> Option<String> {
        self.last_commit("%an", path)
    }

    fn origin_url(&self) -> Option<String> {
        self.run(&["remote", "get-url", "origin"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outside_a_repository_yields_nothing() {
        let dir = tempdir::TempDir::new("piclet_git").unwrap();
        let git = GitCli::new(dir.path());
        assert_eq!(git.origin_url(), None);
        assert_eq!(git.author_email(&dir.path().join("a.gds")), None);
    }

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// `path` spelled relative to the current directory.
    fn relative_to_cwd(path: &Path) -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        let mut rel = PathBuf::new();
        for _ in cwd.components().skip(1) {
            rel.push("..");
        }
        rel.join(path.strip_prefix("/").unwrap())
    }

    #[test]
    fn nested_relative_submission_paths_resolve() {
        let dir = tempdir::TempDir::new("piclet_git_nested").unwrap();
        let repo = std::fs::canonicalize(dir.path()).unwrap();
        let submissions = repo.join("work").join("submissions");
        std::fs::create_dir_all(&submissions).unwrap();
        std::fs::write(submissions.join("a.gds"), b"layout").unwrap();
        if !git(&repo, &["init", "-q"]) {
            // No usable git on this machine.
            return;
        }
        assert!(git(&repo, &["add", "."]));
        assert!(git(
            &repo,
            &[
                "-c",
                "user.name=Alice",
                "-c",
                "user.email=1+alice@users.noreply.github.com",
                "commit",
                "-q",
                "-m",
                "submit",
            ],
        ));

        let cli = GitCli::new(relative_to_cwd(&repo.join("work")));
        let file = relative_to_cwd(&submissions.join("a.gds"));
        assert!(file.is_relative());
        assert_eq!(
            cli.author_email(&file).as_deref(),
            Some("1+alice@users.noreply.github.com")
        );
        assert_eq!(cli.author_name(&file).as_deref(), Some("Alice"));
    }
}
