//! One deployment pass for a submission.
//!
//! ensure repository → decode attachments → generate app files → merge →
//! commit → enable Pages. Steps run strictly in order; the first repository
//! host failure ends the pass and whatever was already written stays on
//! GitHub.

use std::sync::Arc;

use pagesmith_common::{DeploymentResult, SubmissionRequest};
use tracing::Instrument;

use crate::attachments::decode_attachments;
use crate::errors::DeployError;
use crate::generator::{AppFiles, Generator};
use crate::github::{FileSet, RepoHost};

pub struct Deployer {
    host: Arc<dyn RepoHost>,
    generator: Arc<Generator>,
    owner: String,
    repo_prefix: String,
}

impl Deployer {
    pub fn new(
        host: Arc<dyn RepoHost>,
        generator: Arc<Generator>,
        owner: &str,
        repo_prefix: &str,
    ) -> Self {
        Self {
            host,
            generator,
            owner: owner.to_string(),
            repo_prefix: repo_prefix.to_string(),
        }
    }

    pub fn repo_name(&self, request: &SubmissionRequest) -> String {
        request.repo_name(&self.repo_prefix)
    }

    /// Run [`Deployer::deploy`] on its own task so the caller's worker is not
    /// held for the whole pass. The task is not cancelled if the caller goes
    /// away.
    pub async fn deploy_detached(
        self: &Arc<Self>,
        request: SubmissionRequest,
    ) -> Result<DeploymentResult, DeployError> {
        let deployer = Arc::clone(self);
        tokio::spawn(async move { deployer.deploy(&request).await })
            .await
            .map_err(|e| DeployError::Aborted(e.to_string()))?
    }

    pub async fn deploy(&self, request: &SubmissionRequest) -> Result<DeploymentResult, DeployError> {
        let repo = self.repo_name(request);
        let span = tracing::info_span!("deploy", task = %request.task, round = request.round, repo = %repo);
        self.run(request, repo).instrument(span).await
    }

    async fn run(
        &self,
        request: &SubmissionRequest,
        repo: String,
    ) -> Result<DeploymentResult, DeployError> {
        let owner = self.owner.as_str();
        let info = self
            .host
            .ensure_repository(owner, &repo)
            .await
            .map_err(|source| DeployError::EnsureRepository {
                owner: owner.to_string(),
                repo: repo.clone(),
                source,
            })?;
        tracing::info!(url = %info.html_url, branch = %info.default_branch, "repository ready");

        let attachments = decode_attachments(&request.attachments);
        let attachment_names: Vec<String> = attachments.keys().cloned().collect();

        let generated = self
            .generator
            .generate(&request.brief, &request.checks, &attachment_names)
            .await;
        tracing::info!(source = ?generated.source, attachments = attachments.len(), "app files generated");

        let files = merge_files(generated.files, attachments);
        let commit_sha = self
            .host
            .commit_files(
                owner,
                &repo,
                &info.default_branch,
                &files,
                &request.commit_message(),
            )
            .await
            .map_err(|source| DeployError::Commit {
                owner: owner.to_string(),
                repo: repo.clone(),
                source,
            })?;
        tracing::info!(commit = %commit_sha, files = files.len(), "files committed");

        let pages_url = self
            .host
            .enable_pages(owner, &repo, &info.default_branch)
            .await
            .map_err(|source| DeployError::EnablePages {
                owner: owner.to_string(),
                repo: repo.clone(),
                source,
            })?;
        tracing::info!(pages = %pages_url, "pages enabled");

        Ok(DeploymentResult {
            repo_url: info.html_url,
            pages_url,
            commit_sha,
        })
    }
}

/// Generated text first, then attachment bytes; an attachment wins a clash.
pub fn merge_files(generated: AppFiles, attachments: FileSet) -> FileSet {
    let mut files: FileSet = generated
        .into_iter()
        .map(|(path, text)| (path, text.into_bytes()))
        .collect();
    files.extend(attachments);
    files
}
