//! GitHub REST client

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::EngineError;
use crate::http::client::{insert_header, sensitive_header, HttpClient};
use crate::services::{ContentEntry, EntryKind, RemoteFile, SourceControl};

const API_VERSION: &str = "2022-11-28";

/// Source control backed by the GitHub REST API
pub struct GitHubClient {
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct Contents {
    name: String,
    path: String,
    sha: String,
    #[serde(rename = "type")]
    kind: EntryKind,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Directory(Vec<Contents>),
    File(Contents),
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

#[derive(Debug, Deserialize)]
struct Branch {
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Debug, Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: &'a str,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl GitHubClient {
    /// Create a client. Anonymous access works for public repositories but
    /// cannot create branches or files.
    pub fn new(
        base_url: &str,
        token: Option<&SecretString>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("autodeploy/", env!("CARGO_PKG_VERSION"))),
        );
        insert_header(&mut headers, "x-github-api-version", API_VERSION)?;
        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                sensitive_header(&format!("Bearer {}", token.expose_secret()))?,
            );
        }

        Ok(Self {
            http: HttpClient::new(base_url, timeout, headers)?,
        })
    }

    fn contents_url(&self, repo: &str, path: &str, git_ref: Option<&str>) -> url::Url {
        let mut url = self.http.endpoint(["repos", repo, "contents", path]);
        if let Some(git_ref) = git_ref {
            url.query_pairs_mut().append_pair("ref", git_ref);
        }
        url
    }

    async fn fetch_file(
        &self,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Option<RemoteFile>, EngineError> {
        let url = self.contents_url(repo, path, git_ref);
        let response: Option<ContentsResponse> = self
            .http
            .get_optional(url)
            .await
            .map_err(|e| scm_error(format!("read {}", path), e))?;

        match response {
            None => Ok(None),
            Some(ContentsResponse::Directory(_)) => Err(EngineError::SourceControlError(format!(
                "{} is a directory",
                path
            ))),
            Some(ContentsResponse::File(file)) => {
                let content = decode_content(&file)?;
                Ok(Some(RemoteFile {
                    path: file.path,
                    sha: file.sha,
                    content,
                }))
            }
        }
    }

    async fn put_contents(
        &self,
        repo: &str,
        path: &str,
        body: PutContents<'_>,
    ) -> Result<(), EngineError> {
        let url = self.http.endpoint(["repos", repo, "contents", path]);
        let _: serde_json::Value = self
            .http
            .put(url, &body)
            .await
            .map_err(|e| scm_error(format!("write {}", path), e))?;
        Ok(())
    }
}

fn decode_content(file: &Contents) -> Result<String, EngineError> {
    let raw = file.content.as_deref().unwrap_or_default();
    match file.encoding.as_deref() {
        Some("base64") => {
            let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = BASE64.decode(compact).map_err(|e| {
                EngineError::SourceControlError(format!("{}: bad base64 content: {}", file.path, e))
            })?;
            String::from_utf8(bytes).map_err(|e| {
                EngineError::SourceControlError(format!("{}: content is not UTF-8: {}", file.path, e))
            })
        }
        Some("none") | None if raw.is_empty() => Err(EngineError::SourceControlError(format!(
            "{}: content not returned inline",
            file.path
        ))),
        _ => Ok(raw.to_string()),
    }
}

/// Keep `NotFound` distinguishable, wrap everything else with context
fn scm_error(context: String, err: EngineError) -> EngineError {
    match err {
        EngineError::NotFound(_) => EngineError::NotFound(context),
        other => EngineError::SourceControlError(format!("{}: {}", context, other)),
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn list_contents(&self, repo: &str, path: &str) -> Result<Vec<ContentEntry>, EngineError> {
        let url = self.contents_url(repo, path, None);
        let response: ContentsResponse = self
            .http
            .get(url)
            .await
            .map_err(|e| scm_error(format!("list {}/{}", repo, path), e))?;

        let items = match response {
            ContentsResponse::Directory(items) => items,
            ContentsResponse::File(item) => vec![item],
        };
        debug!("Listed {} entries under {}/{}", items.len(), repo, path);

        Ok(items
            .into_iter()
            .map(|item| ContentEntry {
                name: item.name,
                path: item.path,
                kind: item.kind,
                size: item.size,
            })
            .collect())
    }

    async fn get_file_content(&self, repo: &str, path: &str) -> Result<String, EngineError> {
        self.fetch_file(repo, path, None)
            .await?
            .map(|file| file.content)
            .ok_or_else(|| EngineError::NotFound(format!("{}/{}", repo, path)))
    }

    async fn default_branch(&self, repo: &str) -> Result<String, EngineError> {
        let url = self.http.endpoint(["repos", repo]);
        let info: RepoInfo = self
            .http
            .get(url)
            .await
            .map_err(|e| scm_error(format!("repository {}", repo), e))?;
        Ok(info.default_branch)
    }

    async fn branch_head_sha(&self, repo: &str, branch: &str) -> Result<String, EngineError> {
        let url = self.http.endpoint(["repos", repo, "branches", branch]);
        let branch_info: Branch = self
            .http
            .get(url)
            .await
            .map_err(|e| scm_error(format!("branch {}", branch), e))?;
        Ok(branch_info.commit.sha)
    }

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), EngineError> {
        let url = self.http.endpoint(["repos", repo, "git", "refs"]);
        let body = CreateRef {
            git_ref: format!("refs/heads/{}", branch),
            sha,
        };
        let _: serde_json::Value = self
            .http
            .post(url, &body)
            .await
            .map_err(|e| scm_error(format!("create branch {}", branch), e))?;
        Ok(())
    }

    async fn get_file_at_ref(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<RemoteFile>, EngineError> {
        self.fetch_file(repo, path, Some(git_ref)).await
    }

    async fn create_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> Result<(), EngineError> {
        let body = PutContents {
            message,
            content: BASE64.encode(content),
            branch,
            sha: None,
        };
        self.put_contents(repo, path, body).await
    }

    async fn update_file(
        &self,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
        sha: &str,
        branch: &str,
    ) -> Result<(), EngineError> {
        let body = PutContents {
            message,
            content: BASE64.encode(content),
            branch,
            sha: Some(sha),
        };
        self.put_contents(repo, path, body).await
    }
}
