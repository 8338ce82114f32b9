use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use piclet::identity::{ApiError, GitHubApi, IdentityResolver, UNKNOWN_HANDLE};

mod common;
use common::FakeGit;

#[derive(Default, Clone)]
struct Calls {
    search: Rc<Cell<usize>>,
    forks: Rc<Cell<usize>>,
}

/// GitHub stand-in with fixed users and forks.
struct FakeApi {
    users: HashMap<String, String>,
    forks: Vec<String>,
    fail: bool,
    calls: Calls,
}

impl FakeApi {
    fn new(calls: &Calls) -> Self {
        Self {
            users: HashMap::new(),
            forks: Vec::new(),
            fail: false,
            calls: calls.clone(),
        }
    }

    fn user(mut self, email: &str, login: &str) -> Self {
        self.users.insert(email.to_string(), login.to_string());
        self
    }

    fn fork(mut self, login: &str) -> Self {
        self.forks.push(login.to_string());
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn error(&self) -> ApiError {
        ApiError::Status {
            status: 500,
            url: "https://api.github.com".to_string(),
        }
    }
}

impl GitHubApi for FakeApi {
    fn search_user(&self, email: &str) -> Result<Option<String>, ApiError> {
        self.calls.search.set(self.calls.search.get() + 1);
        if self.fail {
            return Err(self.error());
        }
        Ok(self.users.get(email).cloned())
    }

    fn list_forks(&self, _owner: &str, _repo: &str) -> Result<Vec<String>, ApiError> {
        self.calls.forks.set(self.calls.forks.get() + 1);
        if self.fail {
            return Err(self.error());
        }
        Ok(self.forks.clone())
    }
}

fn aliases() -> HashMap<String, String> {
    HashMap::from([("lukasc".to_string(), "lukasc-ubc".to_string())])
}

fn resolver(git: FakeGit, api: Option<FakeApi>) -> IdentityResolver {
    IdentityResolver::new(
        Box::new(git),
        api.map(|api| Box::new(api) as Box<dyn GitHubApi>),
        aliases(),
    )
}

fn origin(git: FakeGit) -> FakeGit {
    FakeGit {
        origin: Some("https://github.com/SiEPIC/piclets.git".to_string()),
        ..git
    }
}

#[test]
fn noreply_email_needs_no_lookup() {
    let calls = Calls::default();
    let git = origin(FakeGit::default().with(
        "a.gds",
        "98765+octocat@users.noreply.github.com",
        "The Octocat",
    ));
    let mut ids = resolver(git, Some(FakeApi::new(&calls).fork("someone")));
    assert_eq!(ids.resolve(Path::new("submissions/a.gds")), "octocat");
    assert_eq!(calls.search.get(), 0);
    assert_eq!(calls.forks.get(), 0);
}

#[test]
fn author_name_matches_a_fork_owner() {
    let calls = Calls::default();
    let git = origin(
        FakeGit::default()
            .with("a.gds", "jane@example.com", "JaneDoe")
            .with("b.gds", "mo@example.com", "Mohammed Al-Sayed"),
    );
    let api = FakeApi::new(&calls)
        .fork("zed")
        .fork("janedoe-photonics")
        .user("mo@example.com", "msayed");
    let mut ids = resolver(git, Some(api));

    assert_eq!(ids.resolve(Path::new("a.gds")), "janedoe-photonics");
    assert_eq!(ids.resolve(Path::new("b.gds")), "msayed");
    assert_eq!(calls.forks.get(), 1);
    assert_eq!(
        ids.cache().forks(),
        Some(&["janedoe-photonics".to_string(), "zed".to_string()][..])
    );
}

#[test]
fn fork_login_contained_in_author_name() {
    let calls = Calls::default();
    let git = origin(FakeGit::default().with("a.gds", "x@example.com", "Bob Smith"));
    let mut ids = resolver(git, Some(FakeApi::new(&calls).fork("Smith")));
    assert_eq!(ids.resolve(Path::new("a.gds")), "Smith");
}

#[test]
fn empty_author_name_never_matches() {
    let calls = Calls::default();
    let git = origin(FakeGit::default().with("a.gds", "jane.doe@example.com", ""));
    let mut ids = resolver(git, Some(FakeApi::new(&calls).fork("anyone")));
    assert_eq!(ids.resolve(Path::new("a.gds")), "janedoe");
    assert_eq!(calls.search.get(), 1);
}

#[test]
fn searches_are_cached() {
    let calls = Calls::default();
    let git = FakeGit::default()
        .with("a.gds", "ann@example.com", "Ann")
        .with("b.gds", "ann@example.com", "Ann")
        .with("c.gds", "nobody@example.com", "Nobody")
        .with("d.gds", "nobody@example.com", "Nobody");
    let api = FakeApi::new(&calls).user("ann@example.com", "ann-gh");
    let mut ids = resolver(git, Some(api));

    assert_eq!(ids.resolve(Path::new("a.gds")), "ann-gh");
    assert_eq!(ids.resolve(Path::new("b.gds")), "ann-gh");
    assert_eq!(ids.resolve(Path::new("c.gds")), "nobody");
    assert_eq!(ids.resolve(Path::new("d.gds")), "nobody");
    assert_eq!(calls.search.get(), 2);
    assert_eq!(ids.cache().user("ann@example.com"), Some(Some("ann-gh")));
    assert_eq!(ids.cache().user("nobody@example.com"), Some(None));
    // No origin remote, so forks are never listed.
    assert_eq!(calls.forks.get(), 0);
}

#[test]
fn api_failures_fall_back_to_the_email() {
    let calls = Calls::default();
    let git = origin(
        FakeGit::default()
            .with("a.gds", "lukasc@ece.ubc.ca", "Lukas")
            .with("b.gds", "lukasc@ece.ubc.ca", "Lukas"),
    );
    let mut ids = resolver(git, Some(FakeApi::new(&calls).failing()));

    assert_eq!(ids.resolve(Path::new("a.gds")), "lukasc-ubc");
    assert_eq!(ids.resolve(Path::new("b.gds")), "lukasc-ubc");
    // Failed searches are retried on the next file; the fork list is not.
    assert_eq!(calls.search.get(), 2);
    assert_eq!(calls.forks.get(), 1);
    assert_eq!(ids.cache().user("lukasc@ece.ubc.ca"), None);
}

#[test]
fn offline_uses_local_heuristics() {
    let git = FakeGit::default()
        .with("a.gds", "first.last-name@example.com", "First")
        .with("b.gds", "not-an-email", "Someone");
    let mut ids = resolver(git, None);
    assert_eq!(ids.resolve(Path::new("a.gds")), "firstlastname");
    assert_eq!(ids.resolve(Path::new("b.gds")), UNKNOWN_HANDLE);
    assert_eq!(ids.resolve(Path::new("untracked.gds")), UNKNOWN_HANDLE);
}
