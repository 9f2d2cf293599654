//! GitHub repository reconciliation: ensure repo, write files, enable Pages.
//!
//! Nothing is cached between calls. Every write looks up the current blob SHA
//! first so a path that already exists is updated instead of rejected.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::GitHubError;

const API_VERSION: &str = "2022-11-28";
const REPO_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_TIMEOUT: Duration = Duration::from_secs(60);

/// Repository-relative path to raw bytes.
pub type FileSet = BTreeMap<String, Vec<u8>>;

/// The parts of a repository the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoInfo {
    pub html_url: String,
    #[serde(rename = "url")]
    pub api_url: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// Conventional Pages address used when GitHub does not report one.
pub fn default_pages_url(owner: &str, name: &str) -> String {
    format!("https://{}.github.io/{}/", owner, name)
}

/// Abstraction over the repository host for testability.
/// Real implementation: `GitHubClient`.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Return the repository, creating it (public, auto-initialized) if absent.
    async fn ensure_repository(&self, owner: &str, name: &str) -> Result<RepoInfo, GitHubError>;

    /// Write every file to `branch` one at a time, in map order, and return
    /// the branch head afterwards. The first failing write aborts the rest.
    async fn commit_files(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        files: &FileSet,
        message: &str,
    ) -> Result<String, GitHubError>;

    /// Serve Pages from the root of `branch` and return the site URL.
    async fn enable_pages(&self, owner: &str, name: &str, branch: &str)
    -> Result<String, GitHubError>;
}

#[derive(Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Serialize)]
struct PagesRequest<'a> {
    source: PagesSource<'a>,
}

#[derive(Serialize)]
struct PagesSource<'a> {
    branch: &'a str,
    path: &'static str,
}

#[derive(Deserialize)]
struct ContentInfo {
    sha: Option<String>,
}

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Deserialize)]
struct PagesInfo {
    html_url: Option<String>,
}

/// GitHub REST client authenticated with a personal access token.
pub struct GitHubClient {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, GitHubError> {
        let base = Url::parse(api_url).map_err(|_| GitHubError::BadUrl(api_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(GitHubError::BadUrl(api_url.to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        headers.insert(USER_AGENT, HeaderValue::from_static("pagesmith"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|source| GitHubError::Transport {
                url: api_url.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            base,
            token: token.to_string(),
        })
    }

    /// Build `{base}/{segments...}` with each segment percent-encoded.
    pub fn endpoint<'a, I>(&self, segments: I) -> Result<Url, GitHubError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| GitHubError::BadUrl(self.base.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn contents_url(&self, owner: &str, name: &str, path: &str) -> Result<Url, GitHubError> {
        let segments = ["repos", owner, name, "contents"]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(segments)
    }

    async fn send(
        &self,
        method: &'static str,
        url: &Url,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, GitHubError> {
        tracing::debug!(method, url = %url, "github request");
        request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| GitHubError::Transport {
                url: url.to_string(),
                source,
            })
    }

    async fn get(&self, url: &Url, timeout: Duration) -> Result<Response, GitHubError> {
        self.send("GET", url, self.http.get(url.clone()).timeout(timeout))
            .await
    }

    async fn content_sha(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        branch: &str,
    ) -> Result<Option<String>, GitHubError> {
        let mut url = self.contents_url(owner, name, path)?;
        url.query_pairs_mut().append_pair("ref", branch);
        let resp = self.get(&url, REPO_TIMEOUT).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let info: ContentInfo = read_json(ensure_success("GET", &url, resp).await?, &url).await?;
        Ok(info.sha)
    }

    async fn put_file(
        &self,
        owner: &str,
        name: &str,
        path: &str,
        body: &PutContentRequest<'_>,
    ) -> Result<(), GitHubError> {
        let url = self.contents_url(owner, name, path)?;
        let resp = self
            .send(
                "PUT",
                &url,
                self.http.put(url.clone()).timeout(WRITE_TIMEOUT).json(body),
            )
            .await?;
        ensure_success("PUT", &url, resp).await?;
        Ok(())
    }

    async fn head_commit(&self, owner: &str, name: &str, branch: &str) -> Result<String, GitHubError> {
        let segments = ["repos", owner, name, "git", "ref", "heads"]
            .into_iter()
            .chain(branch.split('/'));
        let url = self.endpoint(segments)?;
        let resp = self.get(&url, REPO_TIMEOUT).await?;
        let head: GitRef = read_json(ensure_success("GET", &url, resp).await?, &url).await?;
        Ok(head.object.sha)
    }
}

#[async_trait]
impl RepoHost for GitHubClient {
    async fn ensure_repository(&self, owner: &str, name: &str) -> Result<RepoInfo, GitHubError> {
        let url = self.endpoint(["repos", owner, name])?;
        let resp = self.get(&url, REPO_TIMEOUT).await?;
        if resp.status() != StatusCode::NOT_FOUND {
            return read_json(ensure_success("GET", &url, resp).await?, &url).await;
        }

        tracing::info!(owner, repo = name, "repository not found; creating");
        let create_url = self.endpoint(["user", "repos"])?;
        let body = CreateRepoRequest {
            name,
            private: false,
            auto_init: true,
        };
        let resp = self
            .send(
                "POST",
                &create_url,
                self.http.post(create_url.clone()).timeout(REPO_TIMEOUT).json(&body),
            )
            .await?;
        read_json(ensure_success("POST", &create_url, resp).await?, &create_url).await
    }

    async fn commit_files(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        files: &FileSet,
        message: &str,
    ) -> Result<String, GitHubError> {
        for (path, bytes) in files {
            let sha = self.content_sha(owner, name, path, branch).await?;
            tracing::debug!(path = %path, update = sha.is_some(), bytes = bytes.len(), "writing file");
            let body = PutContentRequest {
                message,
                content: STANDARD.encode(bytes),
                branch,
                sha,
            };
            self.put_file(owner, name, path, &body).await?;
        }
        self.head_commit(owner, name, branch).await
    }

    async fn enable_pages(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
    ) -> Result<String, GitHubError> {
        let url = self.endpoint(["repos", owner, name, "pages"])?;
        let body = PagesRequest {
            source: PagesSource { branch, path: "/" },
        };

        let created = self
            .send(
                "POST",
                &url,
                self.http.post(url.clone()).timeout(REPO_TIMEOUT).json(&body),
            )
            .await?;
        if !matches!(created.status(), StatusCode::CREATED | StatusCode::NO_CONTENT) {
            tracing::debug!(status = created.status().as_u16(), "pages create rejected; updating");
            let updated = self
                .send(
                    "PUT",
                    &url,
                    self.http.put(url.clone()).timeout(REPO_TIMEOUT).json(&body),
                )
                .await?;
            if !updated.status().is_success() {
                tracing::warn!(
                    owner,
                    repo = name,
                    status = updated.status().as_u16(),
                    "pages update rejected"
                );
            }
        }

        let resp = self.get(&url, REPO_TIMEOUT).await?;
        let info: PagesInfo = read_json(ensure_success("GET", &url, resp).await?, &url).await?;
        Ok(info
            .html_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| default_pages_url(owner, name)))
    }
}

async fn ensure_success(
    method: &'static str,
    url: &Url,
    resp: Response,
) -> Result<Response, GitHubError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GitHubError::Status {
        method,
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(resp: Response, url: &Url) -> Result<T, GitHubError> {
    let bytes = resp.bytes().await.map_err(|source| GitHubError::Transport {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| GitHubError::Malformed {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn client() -> GitHubClient {
        GitHubClient::new("https://api.github.com", "ghp_test").unwrap()
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Requests seen by a fake API.
    #[derive(Default)]
    struct Seen {
        creates: AtomicUsize,
        heads: AtomicUsize,
        puts: Mutex<Vec<String>>,
    }

    type Reply = (axum::http::StatusCode, Json<Value>);

    fn reply(status: u16, body: Value) -> Reply {
        (axum::http::StatusCode::from_u16(status).unwrap(), Json(body))
    }

    /// Fake API whose content lookups answer `lookup_status` and whose writes
    /// of `reject_path` answer 422.
    fn contents_api(seen: Arc<Seen>, lookup_status: u16, reject_path: &'static str) -> Router {
        Router::new()
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(move || async move { reply(lookup_status, json!({"message": "lookup"})) })
                    .put(
                        move |State(seen): State<Arc<Seen>>,
                              Path((_, _, path)): Path<(String, String, String)>| async move {
                            seen.puts.lock().unwrap().push(path.clone());
                            if path == reject_path {
                                reply(422, json!({"message": "sha wasn't supplied"}))
                            } else {
                                reply(201, json!({"content": {"sha": "new"}}))
                            }
                        },
                    ),
            )
            .route(
                "/repos/{owner}/{repo}/git/ref/heads/{*branch}",
                get(|State(seen): State<Arc<Seen>>| async move {
                    seen.heads.fetch_add(1, Ordering::SeqCst);
                    reply(200, json!({"object": {"sha": "head"}}))
                }),
            )
            .with_state(seen)
    }

    fn files(names: &[&str]) -> FileSet {
        names
            .iter()
            .map(|name| (name.to_string(), b"x".to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn test_ensure_repository_propagates_lookup_failure_without_creating() {
        let seen = Arc::new(Seen::default());
        let app = Router::new()
            .route(
                "/repos/{owner}/{repo}",
                get(|| async { reply(500, json!({"message": "boom"})) }),
            )
            .route(
                "/user/repos",
                post(|State(seen): State<Arc<Seen>>| async move {
                    seen.creates.fetch_add(1, Ordering::SeqCst);
                    reply(201, json!({}))
                }),
            )
            .with_state(seen.clone());
        let client = GitHubClient::new(&serve(app).await, "t").unwrap();

        let err = client.ensure_repository("o", "r").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(seen.creates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_repository_creates_on_not_found() {
        let seen = Arc::new(Seen::default());
        let app = Router::new()
            .route(
                "/repos/{owner}/{repo}",
                get(|| async { reply(404, json!({"message": "Not Found"})) }),
            )
            .route(
                "/user/repos",
                post(|State(seen): State<Arc<Seen>>, Json(body): Json<Value>| async move {
                    seen.creates.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(body["private"], false);
                    reply(
                        201,
                        json!({
                            "html_url": "https://github.com/o/r",
                            "url": "https://api.github.com/repos/o/r",
                            "default_branch": "trunk"
                        }),
                    )
                }),
            )
            .with_state(seen.clone());
        let client = GitHubClient::new(&serve(app).await, "t").unwrap();

        let info = client.ensure_repository("o", "r").await.unwrap();
        assert_eq!(info.default_branch, "trunk");
        assert_eq!(seen.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sha_lookup_failure_is_not_treated_as_missing() {
        let seen = Arc::new(Seen::default());
        let base = serve(contents_api(seen.clone(), 502, "")).await;
        let client = GitHubClient::new(&base, "t").unwrap();

        let err = client
            .commit_files("o", "r", "main", &files(&["index.html"]), "initial: demo")
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::Status { method: "GET", status: 502, .. }));
        assert!(seen.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_write_stops_remaining_files() {
        let seen = Arc::new(Seen::default());
        let base = serve(contents_api(seen.clone(), 404, "b.txt")).await;
        let client = GitHubClient::new(&base, "t").unwrap();

        let err = client
            .commit_files("o", "r", "main", &files(&["a.txt", "b.txt", "c.txt"]), "m")
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::Status { method: "PUT", status: 422, .. }));
        assert_eq!(*seen.puts.lock().unwrap(), vec!["a.txt", "b.txt"]);
        assert_eq!(seen.heads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commit_returns_branch_head_after_writes() {
        let seen = Arc::new(Seen::default());
        let base = serve(contents_api(seen.clone(), 404, "")).await;
        let client = GitHubClient::new(&base, "t").unwrap();

        let sha = client
            .commit_files("o", "r", "main", &files(&["a.txt", "dir/b.txt"]), "m")
            .await
            .unwrap();
        assert_eq!(sha, "head");
        assert_eq!(*seen.puts.lock().unwrap(), vec!["a.txt", "dir/b.txt"]);
    }

    #[tokio::test]
    async fn test_pages_url_falls_back_when_missing() {
        let app = Router::new().route(
            "/repos/{owner}/{repo}/pages",
            post(|| async { reply(201, json!({})) })
                .get(|| async { reply(200, json!({"status": "built"})) }),
        );
        let client = GitHubClient::new(&serve(app).await, "t").unwrap();

        let url = client.enable_pages("o", "r", "main").await.unwrap();
        assert_eq!(url, "https://o.github.io/r/");
    }

    #[tokio::test]
    async fn test_pages_update_rejection_is_tolerated() {
        let app = Router::new().route(
            "/repos/{owner}/{repo}/pages",
            post(|| async { reply(409, json!({"message": "exists"})) })
                .put(|| async { reply(400, json!({"message": "no"})) })
                .get(|| async { reply(200, json!({"html_url": "https://custom.example/"})) }),
        );
        let client = GitHubClient::new(&serve(app).await, "t").unwrap();

        let url = client.enable_pages("o", "r", "main").await.unwrap();
        assert_eq!(url, "https://custom.example/");
    }

    #[tokio::test]
    async fn test_pages_lookup_failure_propagates() {
        let app = Router::new().route(
            "/repos/{owner}/{repo}/pages",
            post(|| async { reply(201, json!({})) })
                .get(|| async { reply(404, json!({"message": "Not Found"})) }),
        );
        let client = GitHubClient::new(&serve(app).await, "t").unwrap();

        let err = client.enable_pages("o", "r", "main").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let url = client().endpoint(["repos", "octocat", "tds-demo"]).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/octocat/tds-demo");
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let client = GitHubClient::new("http://127.0.0.1:9000/api/v3/", "t").unwrap();
        let url = client.endpoint(["user", "repos"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/v3/user/repos");
    }

    #[test]
    fn test_contents_url_encodes_each_segment() {
        let url = client()
            .contents_url("octocat", "tds-demo", "assets/my file.csv")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octocat/tds-demo/contents/assets/my%20file.csv"
        );
    }

    #[test]
    fn test_new_rejects_non_base_url() {
        assert!(matches!(
            GitHubClient::new("mailto:someone@example.com", "t"),
            Err(GitHubError::BadUrl(_))
        ));
        assert!(matches!(
            GitHubClient::new("not a url", "t"),
            Err(GitHubError::BadUrl(_))
        ));
    }

    #[test]
    fn test_put_body_omits_sha_for_new_files() {
        let body = PutContentRequest {
            message: "initial: demo",
            content: STANDARD.encode(b"hi"),
            branch: "main",
            sha: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["content"], "aGk=");
        assert!(json.get("sha").is_none());

        let body = PutContentRequest {
            sha: Some("abc".into()),
            ..body
        };
        assert_eq!(serde_json::to_value(&body).unwrap()["sha"], "abc");
    }

    #[test]
    fn test_repo_info_defaults_branch() {
        let info: RepoInfo = serde_json::from_value(serde_json::json!({
            "html_url": "https://github.com/octocat/tds-demo",
            "url": "https://api.github.com/repos/octocat/tds-demo"
        }))
        .unwrap();
        assert_eq!(info.default_branch, "main");
        assert_eq!(info.api_url, "https://api.github.com/repos/octocat/tds-demo");
    }

    #[test]
    fn test_default_pages_url() {
        assert_eq!(
            default_pages_url("octocat", "tds-demo"),
            "https://octocat.github.io/tds-demo/"
        );
    }
}
