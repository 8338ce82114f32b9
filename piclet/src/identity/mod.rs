//! Maps submission files to the GitHub handles of their authors.

use std::collections::HashMap;
use std::path::Path;

use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::PicletConfig;
use crate::log::{debug, info, warn};

pub mod git;
pub mod github;

pub use git::{CommitSource, GitCli};
pub use github::{ApiError, GitHubApi, GitHubClient, RetryPolicy};

/// Handle used when nothing better can be derived.
pub const UNKNOWN_HANDLE: &str = "unknown";

lazy_static! {
    static ref NOREPLY: Regex =
        Regex::new(r"(?i)^[^@+]*\+([^@+]+)@users\.noreply\.github\.com$").unwrap();
}

/// The login embedded in a GitHub no-reply address, if `email` is one.
pub fn noreply_login(email: &str) -> Option<&str> {
    NOREPLY
        .captures(email)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Splits a GitHub remote URL (https or ssh) into owner and repository.
pub fn parse_github_remote(url: &str) -> Option<(String, String)> {
    let (_, rest) = url.trim().split_once("github.com")?;
    let rest = rest.strip_prefix(|c: char| c == '/' || c == ':')?;
    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let (owner, repo) = rest.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Results of GitHub lookups, kept for one batch run.
#[derive(Debug, Default, Clone)]
pub struct IdentityCache {
    users: HashMap<String, Option<String>>,
    forks: Option<Vec<String>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached search result for `email`. `Some(None)` is a cached miss.
    pub fn user(&self, email: &str) -> Option<Option<&str>> {
        self.users.get(email).map(|login| login.as_deref())
    }

    pub fn forks(&self) -> Option<&[String]> {
        self.forks.as_deref()
    }
}

/// Resolves the author handle of a submission file.
pub struct IdentityResolver {
    git: Box<dyn CommitSource>,
    api: Option<Box<dyn GitHubApi>>,
    cache: IdentityCache,
    aliases: HashMap<String, String>,
}

impl IdentityResolver {
    /// Creates a resolver. With `api` set to `None` only local heuristics are used.
    pub fn new(
        git: Box<dyn CommitSource>,
        api: Option<Box<dyn GitHubApi>>,
        aliases: HashMap<String, String>,
    ) -> Self {
        Self {
            git,
            api,
            cache: IdentityCache::new(),
            aliases,
        }
    }

    /// A resolver reading git metadata from the repository that holds the
    /// submissions directory. GitHub is queried unless `offline` is set or
    /// lookups are disabled in `config`.
    pub fn from_config(config: &PicletConfig, offline: bool) -> Self {
        let repo_dir = config
            .submissions_dir
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let api: Option<Box<dyn GitHubApi>> = if offline || !config.github.enabled {
            None
        } else {
            match GitHubClient::new(&config.github) {
                Ok(client) => Some(Box::new(client)),
                Err(err) => {
                    warn!("GitHub lookups disabled: {err}");
                    None
                }
            }
        };
        Self::new(
            Box::new(GitCli::new(repo_dir)),
            api,
            config.handle_aliases.clone(),
        )
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// The handle of the last author of `path`.
    ///
    /// Tries, in order: a GitHub no-reply email, a fork owner matching the
    /// author name, a GitHub user search by email, and the email local part.
    /// Never fails; `unknown` is returned when no email is available.
    pub fn resolve(&mut self, path: &Path) -> String {
        let email = match self.git.author_email(path) {
            Some(email) if !email.trim().is_empty() => email.trim().to_string(),
            _ => {
                warn!("no commit author for {path:?}");
                return UNKNOWN_HANDLE.to_string();
            }
        };

        if let Some(login) = noreply_login(&email) {
            debug!("{path:?}: no-reply address gives {login}");
            return login.to_string();
        }
        if let Some(login) = self.fork_owner(path) {
            info!("{path:?}: matched author to fork owner {login}");
            return login;
        }
        if let Some(login) = self.search_user(&email) {
            return login;
        }
        self.local_handle(&email)
            .unwrap_or_else(|| UNKNOWN_HANDLE.to_string())
    }

    fn fork_owner(&mut self, path: &Path) -> Option<String> {
        let forks = self.forks();
        if forks.is_empty() {
            return None;
        }
        let name = self.git.author_name(path)?.trim().to_lowercase();
        if name.is_empty() {
            return None;
        }
        forks
            .iter()
            .find(|login| {
                let login = login.to_lowercase();
                !login.is_empty() && (login.contains(&name) || name.contains(&login))
            })
            .cloned()
    }

    /// The fork owners of the origin repository, fetched once.
    fn forks(&mut self) -> Vec<String> {
        if let Some(forks) = &self.cache.forks {
            return forks.clone();
        }
        let forks = match (&self.api, self.git.origin_url()) {
            (Some(api), Some(url)) => match parse_github_remote(&url) {
                Some((owner, repo)) => match api.list_forks(&owner, &repo) {
                    Ok(forks) => {
                        info!("found {} forks of {owner}/{repo}", forks.len());
                        forks.into_iter().sorted().dedup().collect()
                    }
                    Err(err) => {
                        warn!("could not list forks of {owner}/{repo}: {err}");
                        Vec::new()
                    }
                },
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        self.cache.forks = Some(forks.clone());
        forks
    }

    fn search_user(&mut self, email: &str) -> Option<String> {
        if let Some(cached) = self.cache.users.get(email) {
            return cached.clone();
        }
        let api = self.api.as_ref()?;
        match api.search_user(email) {
            Ok(login) => {
                self.cache.users.insert(email.to_string(), login.clone());
                login
            }
            Err(err) => {
                warn!("GitHub user lookup failed for {email}: {err}");
                None
            }
        }
    }

    fn local_handle(&self, email: &str) -> Option<String> {
        let (local, _) = email.split_once('@')?;
        let handle: String = local.chars().filter(|c| !matches!(c, '.' | '-')).collect();
        if handle.is_empty() {
            return None;
        }
        Some(self.aliases.get(&handle).cloned().unwrap_or(handle))
    }
}

/// Hands out unique handles: `h`, then `h2`, `h3`, ...
#[derive(Debug, Default, Clone)]
pub struct HandleAllocator {
    seen: HashMap<String, usize>,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, base: &str) -> String {
        let count = self.seen.entry(base.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            base.to_string()
        } else {
            format!("{base}{count}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noreply_addresses() {
        assert_eq!(
            noreply_login("12345+octocat@users.noreply.github.com"),
            Some("octocat")
        );
        assert_eq!(noreply_login("octocat@users.noreply.github.com"), None);
        assert_eq!(noreply_login("jane+work@example.com"), None);
    }

    #[test]
    fn github_remotes() {
        let expected = Some(("SiEPIC".to_string(), "piclets".to_string()));
        assert_eq!(parse_github_remote("https://github.com/SiEPIC/piclets.git"), expected);
        assert_eq!(parse_github_remote("https://github.com/SiEPIC/piclets"), expected);
        assert_eq!(parse_github_remote("git@github.com:SiEPIC/piclets.git"), expected);
        assert_eq!(parse_github_remote("ssh://git@github.com/SiEPIC/piclets/"), expected);
        assert_eq!(parse_github_remote("https://gitlab.com/SiEPIC/piclets"), None);
        assert_eq!(parse_github_remote("https://github.com/SiEPIC"), None);
    }

    #[test]
    fn duplicate_handles_get_suffixes() {
        let mut handles = HandleAllocator::new();
        assert_eq!(handles.allocate("alice"), "alice");
        assert_eq!(handles.allocate("bob"), "bob");
        assert_eq!(handles.allocate("alice"), "alice2");
        assert_eq!(handles.allocate("alice"), "alice3");
    }
}
