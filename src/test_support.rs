//! In-memory `RepoHost` used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::errors::GitHubError;
use crate::github::{FileSet, RepoHost, RepoInfo, default_pages_url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub path: String,
    pub prior_sha: Option<String>,
    pub message: String,
}

/// GitHub stand-in. Blob SHAs are a per-write counter (`blob1`, `blob2`, ...).
#[derive(Default)]
pub struct MemoryHost {
    repos: Mutex<HashSet<String>>,
    files: Mutex<HashMap<(String, String), (String, Vec<u8>)>>,
    writes: Mutex<Vec<Write>>,
    creates: AtomicUsize,
    pages_calls: AtomicUsize,
    calls: AtomicUsize,
    fail_on_path: Option<String>,
}

impl MemoryHost {
    /// Host whose write of `path` is rejected with a 409.
    pub fn failing_on(path: &str) -> Self {
        Self {
            fail_on_path: Some(path.to_string()),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn file(&self, repo: &str, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(&(repo.to_string(), path.to_string()))
            .map(|(_, bytes)| bytes.clone())
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn pages_calls(&self) -> usize {
        self.pages_calls.load(Ordering::SeqCst)
    }

    /// Every trait call, whatever its outcome.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepoHost for MemoryHost {
    async fn ensure_repository(&self, owner: &str, name: &str) -> Result<RepoInfo, GitHubError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.repos.lock().unwrap().insert(name.to_string()) {
            self.creates.fetch_add(1, Ordering::SeqCst);
        }
        Ok(RepoInfo {
            html_url: format!("https://github.com/{}/{}", owner, name),
            api_url: format!("https://api.github.com/repos/{}/{}", owner, name),
            default_branch: "main".into(),
        })
    }

    async fn commit_files(
        &self,
        _owner: &str,
        name: &str,
        _branch: &str,
        files: &FileSet,
        message: &str,
    ) -> Result<String, GitHubError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut store = self.files.lock().unwrap();
        let mut writes = self.writes.lock().unwrap();
        for (path, bytes) in files {
            if self.fail_on_path.as_deref() == Some(path.as_str()) {
                return Err(GitHubError::Status {
                    method: "PUT",
                    url: path.clone(),
                    status: 409,
                    body: "conflict".into(),
                });
            }
            let key = (name.to_string(), path.clone());
            let prior_sha = store.get(&key).map(|(sha, _)| sha.clone());
            let sha = format!("blob{}", writes.len() + 1);
            writes.push(Write {
                path: path.clone(),
                prior_sha,
                message: message.to_string(),
            });
            store.insert(key, (sha, bytes.clone()));
        }
        Ok(format!("commit{}", writes.len()))
    }

    async fn enable_pages(
        &self,
        owner: &str,
        name: &str,
        _branch: &str,
    ) -> Result<String, GitHubError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages_calls.fetch_add(1, Ordering::SeqCst);
        Ok(default_pages_url(owner, name))
    }
}
