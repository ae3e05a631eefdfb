use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

use crate::error::{HostError, HostResult};

use super::{classify_artifact, download_file, ArtifactSelector, ArtifactSet, BuildProvider};

#[derive(Debug, Deserialize)]
struct LatestBuildResponse {
    build_id: String,
}

/// Client for the internal build server. No account scoping; artifacts are
/// addressed by branch/target/build.
pub struct InternalBuildClient {
    client: Client,
    base_url: String,
    cache_dir: PathBuf,
}

impl InternalBuildClient {
    pub fn new(base_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_dir: cache_dir.into(),
        }
    }

    async fn latest_build_id(&self, branch: &str, target: &str) -> HostResult<String> {
        let url = format!("{}/builds/v1/{}/{}/latest", self.base_url, branch, target);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(HostError::Transport(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }
        let latest: LatestBuildResponse = response.json().await?;
        Ok(latest.build_id)
    }
}

#[async_trait]
impl BuildProvider for InternalBuildClient {
    fn provider_name(&self) -> &str {
        "ab"
    }

    async fn fetch(&self, selector: &ArtifactSelector) -> HostResult<ArtifactSet> {
        let branch = selector
            .branch
            .as_deref()
            .ok_or_else(|| HostError::Argument("--branch is required for ab".to_string()))?;
        let target = selector
            .target
            .as_deref()
            .ok_or_else(|| HostError::Argument("--target is required for ab".to_string()))?;
        let artifact_name = selector.artifact_name.as_deref().ok_or_else(|| {
            HostError::Argument("--artifact_name is required for ab".to_string())
        })?;

        let build_id = match selector.build_id.as_deref() {
            Some(id) if id != "latest" => id.to_string(),
            _ => self.latest_build_id(branch, target).await?,
        };
        let artifact_name = artifact_name.replace("{id}", &build_id);

        let url = format!(
            "{}/builds/v1/{}/{}/{}/{}",
            self.base_url, branch, target, build_id, artifact_name
        );
        let dest = self.cache_dir.join(&build_id).join(&artifact_name);
        download_file(&self.client, &url, &dest).await?;
        info!(branch, target, build_id, artifact = %artifact_name, "fetched internal build artifact");

        let mut set = ArtifactSet {
            build_id: Some(build_id),
            ..Default::default()
        };
        classify_artifact(&mut set, &artifact_name, dest);
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_with_explicit_build_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/builds/v1/oc-release/marlin-userdebug/4329875/boot.img"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"boot".to_vec()))
            .mount(&server)
            .await;

        let cache = tempfile::tempdir().unwrap();
        let client = InternalBuildClient::new(server.uri(), cache.path());
        let selector = ArtifactSelector {
            branch: Some("oc-release".to_string()),
            target: Some("marlin-userdebug".to_string()),
            build_id: Some("4329875".to_string()),
            artifact_name: Some("boot.img".to_string()),
            ..Default::default()
        };
        let set = client.fetch(&selector).await.unwrap();
        assert_eq!(set.build_id.as_deref(), Some("4329875"));
        assert!(set.device_images.contains_key("boot.img"));
    }

    #[tokio::test]
    async fn test_fetch_resolves_latest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/builds/v1/main/sailfish-userdebug/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "build_id": "777"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/builds/v1/main/sailfish-userdebug/777/system.img"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"system".to_vec()))
            .mount(&server)
            .await;

        let cache = tempfile::tempdir().unwrap();
        let client = InternalBuildClient::new(server.uri(), cache.path());
        let selector = ArtifactSelector {
            branch: Some("main".to_string()),
            target: Some("sailfish-userdebug".to_string()),
            artifact_name: Some("system.img".to_string()),
            ..Default::default()
        };
        let set = client.fetch(&selector).await.unwrap();
        assert_eq!(set.build_id.as_deref(), Some("777"));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/builds/v1/main/t/1/missing.img"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = tempfile::tempdir().unwrap();
        let client = InternalBuildClient::new(server.uri(), cache.path());
        let selector = ArtifactSelector {
            branch: Some("main".to_string()),
            target: Some("t".to_string()),
            build_id: Some("1".to_string()),
            artifact_name: Some("missing.img".to_string()),
            ..Default::default()
        };
        let err = client.fetch(&selector).await.unwrap_err();
        assert!(matches!(err, HostError::Transport(_)));
    }
}
