//! In-memory hosts for unit tests.
//!
//! - [`ScriptedHost`] answers from a URL → response table.
//! - [`FakeGitHub`] implements the destination tree/blob/commit/ref protocol
//!   so reconciliation can be asserted end to end without network access.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use crate::config::GitHubConfig;
use crate::http::{ApiRequest, HttpExecutor, HttpFailure, HttpResult, Method, Url};
use crate::model::Signature;

fn not_found(url: &str) -> HttpFailure {
    HttpFailure::Status {
        url: url.to_string(),
        status: 404,
        message: "Not Found".into(),
    }
}

// ── ScriptedHost ──────────────────────────────────────────────

/// Canned responses keyed by exact URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedHost {
    responses: HashMap<String, HttpResult<Value>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, body: Value) -> Self {
        self.responses.insert(url.to_string(), Ok(body));
        self
    }

    pub fn fail(mut self, url: &str, status: u16, message: &str) -> Self {
        self.responses.insert(
            url.to_string(),
            Err(HttpFailure::Status {
                url: url.to_string(),
                status,
                message: message.to_string(),
            }),
        );
        self
    }

    /// URLs requested so far, in order.
    pub fn requested(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|r| r.url.clone()).collect()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.log.lock().unwrap().last().map(|r| r.auth.header_value())
    }
}

impl HttpExecutor for ScriptedHost {
    async fn execute(&self, request: ApiRequest) -> HttpResult<Value> {
        let url = request.url.clone();
        self.log.lock().unwrap().push(request);
        self.responses
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Err(not_found(&url)))
    }
}

// ── FakeGitHub ────────────────────────────────────────────────

/// Destination config pointing at [`FakeGitHub`], owner `jane`, branch `main`.
pub fn github_config(repo: &str) -> GitHubConfig {
    GitHubConfig {
        api_url: FakeGitHub::API.parse().unwrap(),
        owner: "jane".into(),
        token: "ghp".into(),
        author: Signature {
            name: "jane".into(),
            email: "jane@x.com".into(),
        },
        repo: repo.into(),
        branch: "main".into(),
    }
}

/// A commit stored by [`FakeGitHub`].
#[derive(Debug, Clone)]
pub struct FakeCommit {
    pub sha: String,
    pub tree: String,
    pub parents: Vec<String>,
    pub message: String,
    pub author: Value,
}

#[derive(Default)]
struct GitState {
    repositories: Vec<String>,
    /// `owner/name` of repositories the user sees but does not own.
    shared: Vec<String>,
    blobs: HashMap<String, String>,
    trees: HashMap<String, BTreeMap<String, String>>,
    commits: HashMap<String, FakeCommit>,
    head: Option<String>,
    next_id: u64,
    calls: Vec<(Method, String)>,
    failures: Vec<(Method, String, u16)>,
    hide_head_tree: bool,
}

impl GitState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }

    fn put_blob(&mut self, content: &str) -> String {
        let sha = self.id("blob");
        self.blobs.insert(sha.clone(), content.to_string());
        sha
    }

    fn put_tree(&mut self, entries: BTreeMap<String, String>) -> String {
        let sha = self.id("tree");
        self.trees.insert(sha.clone(), entries);
        sha
    }

    fn put_commit(&mut self, tree: String, parents: Vec<String>, message: &str, author: Value) -> String {
        let sha = self.id("commit");
        self.commits.insert(
            sha.clone(),
            FakeCommit {
                sha: sha.clone(),
                tree,
                parents,
                message: message.to_string(),
                author,
            },
        );
        sha
    }

    fn head_tree(&self) -> BTreeMap<String, String> {
        self.head
            .as_ref()
            .and_then(|sha| self.commits.get(sha))
            .and_then(|c| self.trees.get(&c.tree))
            .cloned()
            .unwrap_or_default()
    }

    /// Commit `path = content` on top of the current head, moving the branch.
    fn seed_file(&mut self, path: &str, content: &str) {
        let mut entries = self.head_tree();
        let blob = self.put_blob(content);
        entries.insert(path.to_string(), blob);
        let tree = self.put_tree(entries);
        let parents = self.head.clone().into_iter().collect();
        let sha = self.put_commit(tree, parents, &format!("seed {path}"), Value::Null);
        self.head = Some(sha);
    }
}

/// In-memory GitHub hosting one owner and one branch (`main`).
pub struct FakeGitHub {
    base: String,
    owner: String,
    state: Mutex<GitState>,
}

impl FakeGitHub {
    pub const API: &'static str = "https://gh.test";

    /// No repositories at all.
    pub fn new(owner: &str) -> Self {
        Self {
            base: Self::API.to_string(),
            owner: owner.to_string(),
            state: Mutex::new(GitState::default()),
        }
    }

    /// An existing, auto-initialised repository named `repo`.
    pub fn with_repository(self, repo: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.repositories.push(repo.to_string());
            state.seed_file("README.md", &format!("# {repo}"));
        }
        self
    }

    /// Other repositories owned by the user, listed before the shadow one.
    pub fn with_other_repositories(self, count: usize) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for i in 0..count {
                state.repositories.insert(i, format!("other-{i}"));
            }
        }
        self
    }

    /// A repository of another account that the user can see.
    pub fn with_shared_repository(self, owner: &str, repo: &str) -> Self {
        self.state.lock().unwrap().shared.push(format!("{owner}/{repo}"));
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.state.lock().unwrap().seed_file(path, content);
        self
    }

    /// Answer `status` to every `method` request whose URL contains `fragment`.
    pub fn failing(self, method: Method, fragment: &str, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .push((method, fragment.to_string(), status));
        self
    }

    /// Branch lookups answer without the `commit.tree` field.
    pub fn without_head_tree(self) -> Self {
        self.state.lock().unwrap().hide_head_tree = true;
        self
    }

    pub fn repositories(&self) -> Vec<String> {
        self.state.lock().unwrap().repositories.clone()
    }

    /// Content of `path` at the branch head.
    pub fn file(&self, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let blob = state.head_tree().get(path).cloned()?;
        state.blobs.get(&blob).cloned()
    }

    /// Commits reachable from the branch head, newest first.
    pub fn history(&self) -> Vec<FakeCommit> {
        let state = self.state.lock().unwrap();
        let mut chain = Vec::new();
        let mut cursor = state.head.clone();
        while let Some(sha) = cursor {
            let Some(commit) = state.commits.get(&sha) else { break };
            cursor = commit.parents.first().cloned();
            chain.push(commit.clone());
        }
        chain
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of non-GET requests received.
    pub fn writes(&self) -> usize {
        self.calls().iter().filter(|(m, _)| *m != Method::Get).count()
    }

    fn route(&self, state: &mut GitState, request: &ApiRequest) -> HttpResult<Value> {
        let url_text = request.url.as_str();
        let missing = || Err(not_found(url_text));

        let Some(rest) = url_text.strip_prefix(&self.base) else {
            return Err(HttpFailure::Transport {
                url: url_text.to_string(),
                message: "unknown host".into(),
            });
        };
        let url = Url::parse(url_text).map_err(|e| HttpFailure::Transport {
            url: url_text.to_string(),
            message: e.to_string(),
        })?;
        let segments: Vec<String> = url
            .path_segments()
            .map(|s| s.map(str::to_string).collect())
            .unwrap_or_default();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let body = request.payload().cloned().unwrap_or(Value::Null);

        if rest.starts_with("/user/repos") {
            return match request.method {
                Method::Get => {
                    let page: usize = query(&url, "page").and_then(|p| p.parse().ok()).unwrap_or(1);
                    let per_page: usize =
                        query(&url, "per_page").and_then(|p| p.parse().ok()).unwrap_or(30);
                    let items: Vec<Value> = state
                        .repositories
                        .iter()
                        .map(|name| format!("{}/{name}", self.owner))
                        .chain(state.shared.iter().cloned())
                        .skip((page - 1) * per_page)
                        .take(per_page)
                        .map(|full_name| {
                            let name = full_name.rsplit('/').next().unwrap_or_default().to_string();
                            json!({"name": name, "full_name": full_name})
                        })
                        .collect();
                    Ok(Value::Array(items))
                }
                Method::Post => {
                    let name = body["name"].as_str().unwrap_or_default().to_string();
                    if state.repositories.contains(&name) {
                        return Err(HttpFailure::Status {
                            url: url_text.to_string(),
                            status: 422,
                            message: "name already exists on this account".into(),
                        });
                    }
                    assert_eq!(body["private"], true);
                    assert_eq!(body["auto_init"], true);
                    state.repositories.push(name.clone());
                    state.seed_file("README.md", &format!("# {name}"));
                    Ok(json!({"name": name}))
                }
                _ => missing(),
            };
        }

        let ["repos", owner, repo, tail @ ..] = segments.as_slice() else {
            return missing();
        };
        if *owner != self.owner || !state.repositories.iter().any(|r| r.as_str() == *repo) {
            return missing();
        }

        match (request.method, tail) {
            (Method::Get, ["commits", "main"]) => {
                let Some(sha) = state.head.clone() else { return missing() };
                let tree = state.commits[&sha].tree.clone();
                if state.hide_head_tree {
                    Ok(json!({"sha": sha, "commit": {"message": "x"}}))
                } else {
                    Ok(json!({"sha": sha, "commit": {"tree": {"sha": tree}}}))
                }
            }
            (Method::Get, ["git", "trees", sha]) => {
                let Some(entries) = state.trees.get(*sha) else { return missing() };
                let tree: Vec<Value> = entries
                    .iter()
                    .map(|(path, blob)| json!({"path": path, "mode": "100644", "type": "blob", "sha": blob}))
                    .collect();
                Ok(json!({"sha": sha, "tree": tree, "truncated": false}))
            }
            (Method::Get, ["git", "blobs", sha]) => {
                let Some(content) = state.blobs.get(*sha) else { return missing() };
                Ok(json!({"sha": sha, "encoding": "base64", "content": wrapped_base64(content)}))
            }
            (Method::Post, ["git", "trees"]) => {
                let base = body["base_tree"].as_str().unwrap_or_default();
                let mut entries = state.trees.get(base).cloned().unwrap_or_default();
                for entry in body["tree"].as_array().cloned().unwrap_or_default() {
                    assert_eq!(entry["mode"], "100644");
                    assert_eq!(entry["type"], "blob");
                    let blob = state.put_blob(entry["content"].as_str().unwrap_or_default());
                    entries.insert(entry["path"].as_str().unwrap_or_default().to_string(), blob);
                }
                let sha = state.put_tree(entries);
                Ok(json!({"sha": sha}))
            }
            (Method::Post, ["git", "commits"]) => {
                let tree = body["tree"].as_str().unwrap_or_default().to_string();
                if !state.trees.contains_key(&tree) {
                    return missing();
                }
                let parents = body["parents"]
                    .as_array()
                    .map(|p| p.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                let message = body["message"].as_str().unwrap_or_default().to_string();
                let sha = state.put_commit(tree, parents, &message, body["author"].clone());
                Ok(json!({"sha": sha}))
            }
            (Method::Patch, ["git", "refs", "heads", "main"]) => {
                assert_eq!(body["force"], false);
                let sha = body["sha"].as_str().unwrap_or_default().to_string();
                let Some(commit) = state.commits.get(&sha) else { return missing() };
                if commit.parents.first() != state.head.as_ref() {
                    return Err(HttpFailure::Status {
                        url: url_text.to_string(),
                        status: 422,
                        message: "Update is not a fast forward".into(),
                    });
                }
                state.head = Some(sha.clone());
                Ok(json!({"ref": "refs/heads/main", "object": {"sha": sha}}))
            }
            _ => missing(),
        }
    }
}

fn query(url: &Url, key: &str) -> Option<String> {
    url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
}

/// Base64 with a line break every 60 characters, like the real API.
fn wrapped_base64(content: &str) -> String {
    let encoded = STANDARD.encode(content);
    encoded
        .as_bytes()
        .chunks(60)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

impl HttpExecutor for FakeGitHub {
    async fn execute(&self, request: ApiRequest) -> HttpResult<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((request.method, request.url.clone()));

        let injected = state
            .failures
            .iter()
            .find(|(method, fragment, _)| *method == request.method && request.url.contains(fragment.as_str()))
            .map(|(_, _, status)| *status);
        if let Some(status) = injected {
            return Err(HttpFailure::Status {
                url: request.url.clone(),
                status,
                message: "injected".into(),
            });
        }

        self.route(&mut state, &request)
    }
}
