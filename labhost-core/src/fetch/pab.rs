use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::{debug, info};

use crate::error::{HostError, HostResult};

use super::{classify_artifact, ArtifactSelector, ArtifactSet, BuildProvider, FetchMethod};

/// One build as reported by the partner build server.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildEntry {
    pub build_id: String,
    #[serde(default)]
    pub successful: bool,
}

#[derive(Debug, Deserialize)]
struct BuildListResponse {
    #[serde(default)]
    builds: Vec<BuildEntry>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the partner build server.
///
/// Downloads artifacts by account/branch/target/build and lists builds for
/// the update sessions. Authentication is optional; anonymous requests work
/// for public accounts.
pub struct PartnerBuildClient {
    client: Client,
    base_url: String,
    account_id: String,
    cache_dir: PathBuf,
    token: RwLock<Option<String>>,
}

impl PartnerBuildClient {
    pub fn new(
        base_url: impl Into<String>,
        account_id: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            cache_dir: cache_dir.into(),
            token: RwLock::new(None),
        }
    }

    /// Exchange the credentials in `userinfo_file` (one `email:password`
    /// line) for an access token. A missing file means anonymous access;
    /// re-authenticating is harmless.
    pub async fn authenticate(&self, userinfo_file: Option<&std::path::Path>) -> HostResult<()> {
        let Some(path) = userinfo_file else {
            return Ok(());
        };
        let contents = tokio::fs::read_to_string(path).await?;
        let line = contents.trim();
        let (email, password) = line.split_once(':').ok_or_else(|| {
            HostError::Argument(format!(
                "userinfo file must contain email:password, got {}",
                path.display()
            ))
        })?;

        let url = format!("{}/auth/v1/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(HostError::RemoteRejected {
                endpoint: "auth/v1/token".to_string(),
                message: format!("status {}", response.status()),
            });
        }
        let token: TokenResponse = response.json().await?;
        *self.token.write().unwrap() = Some(token.access_token);
        debug!("partner build server authentication succeeded");
        Ok(())
    }

    fn bearer(&self) -> Option<String> {
        self.token.read().unwrap().clone()
    }

    /// List builds for a branch/target, newest first.
    pub async fn list_builds(
        &self,
        account_id: &str,
        branch: &str,
        target: &str,
        page_token: &str,
        max_results: u32,
    ) -> HostResult<Vec<BuildEntry>> {
        let url = format!("{}/builds/v1/list", self.base_url);
        let mut request = self.client.get(&url).query(&[
            ("account_id", account_id),
            ("branch", branch),
            ("target", target),
            ("page_token", page_token),
            ("max_results", &max_results.to_string()),
        ]);
        if let Some(token) = self.bearer() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(HostError::Transport(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }
        let list: BuildListResponse = response.json().await?;
        Ok(list.builds)
    }

    /// The newest successful build id for a branch/target.
    pub async fn latest_build_id(
        &self,
        account_id: &str,
        branch: &str,
        target: &str,
    ) -> HostResult<String> {
        let builds = self
            .list_builds(account_id, branch, target, "", 20)
            .await?;
        builds
            .into_iter()
            .find(|b| b.successful)
            .map(|b| b.build_id)
            .ok_or_else(|| {
                HostError::NotFound(format!(
                    "no successful build for {} on {}",
                    target, branch
                ))
            })
    }

    async fn download_artifact(
        &self,
        account_id: &str,
        branch: &str,
        target: &str,
        build_id: &str,
        artifact_name: &str,
        method: FetchMethod,
    ) -> HostResult<PathBuf> {
        let url = format!(
            "{}/artifacts/v1/{}/{}/{}/{}/{}",
            self.base_url, account_id, branch, target, build_id, artifact_name
        );
        let mut request = match method {
            FetchMethod::Get => self.client.get(&url),
            FetchMethod::Post => self.client.post(&url),
        };
        if let Some(token) = self.bearer() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(HostError::Transport(format!(
                "{} {} returned {}",
                method.as_str(),
                url,
                response.status()
            )));
        }
        let bytes = response.bytes().await?;

        let dest_dir = self.cache_dir.join(build_id);
        tokio::fs::create_dir_all(&dest_dir).await?;
        let dest = dest_dir.join(artifact_name);
        tokio::fs::write(&dest, &bytes).await?;
        Ok(dest)
    }
}

#[async_trait]
impl BuildProvider for PartnerBuildClient {
    fn provider_name(&self) -> &str {
        "pab"
    }

    async fn fetch(&self, selector: &ArtifactSelector) -> HostResult<ArtifactSet> {
        let branch = selector
            .branch
            .as_deref()
            .ok_or_else(|| HostError::Argument("--branch is required for pab".to_string()))?;
        let target = selector
            .target
            .as_deref()
            .ok_or_else(|| HostError::Argument("--target is required for pab".to_string()))?;
        let artifact_name = selector.artifact_name.as_deref().ok_or_else(|| {
            HostError::Argument("--artifact_name is required for pab".to_string())
        })?;
        let account_id = selector.account_id.as_deref().unwrap_or(&self.account_id);

        self.authenticate(selector.userinfo_file.as_deref()).await?;

        let build_id = match selector.build_id.as_deref() {
            Some(id) if id != "latest" => id.to_string(),
            _ => self.latest_build_id(account_id, branch, target).await?,
        };
        let artifact_name = artifact_name.replace("{id}", &build_id);

        let path = self
            .download_artifact(
                account_id,
                branch,
                target,
                &build_id,
                &artifact_name,
                selector.method,
            )
            .await?;
        info!(branch, target, build_id, artifact = %artifact_name, "fetched partner build artifact");

        let mut set = ArtifactSet {
            build_id: Some(build_id),
            ..Default::default()
        };
        classify_artifact(&mut set, &artifact_name, path);
        Ok(set)
    }
}
