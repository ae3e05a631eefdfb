//! Resource-locator dispatch for test resources.
//!
//! Leased tasks and scripts can name artifacts by URL instead of spelling
//! out fetch flags; the scheme picks the provider:
//!
//! - `pab://<account>/<branch>/<target>/<build_id>/<artifact>`
//! - `ab://<branch>/<target>/<build_id>/<artifact>`
//! - `gs://<bucket>/<path>`

use url::Url;

use crate::error::{HostError, HostResult};

use super::ArtifactSelector;

/// Which provider a locator resolves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Pab,
    Ab,
    Gcs,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Pab => "pab",
            ProviderKind::Ab => "ab",
            ProviderKind::Gcs => "gcs",
        }
    }
}

/// A parsed resource locator, ready to hand to the matching provider.
#[derive(Debug, Clone)]
pub struct ResourceLocator {
    pub kind: ProviderKind,
    pub selector: ArtifactSelector,
}

impl ResourceLocator {
    pub fn parse(raw: &str) -> HostResult<Self> {
        let url = Url::parse(raw)
            .map_err(|e| HostError::Argument(format!("invalid resource locator {}: {}", raw, e)))?;

        match url.scheme() {
            "pab" => {
                let parts = locator_parts(&url);
                let [account_id, branch, target, build_id, artifact_name] =
                    parts.as_slice()
                else {
                    return Err(HostError::Argument(format!(
                        "invalid pab resource locator: {}",
                        raw
                    )));
                };
                Ok(Self {
                    kind: ProviderKind::Pab,
                    selector: ArtifactSelector {
                        account_id: Some(account_id.to_string()),
                        branch: Some(branch.to_string()),
                        target: Some(target.to_string()),
                        build_id: Some(build_id.to_string()),
                        artifact_name: Some(artifact_name.to_string()),
                        ..Default::default()
                    },
                })
            }
            "ab" => {
                let parts = locator_parts(&url);
                let [branch, target, build_id, artifact_name] = parts.as_slice() else {
                    return Err(HostError::Argument(format!(
                        "invalid ab resource locator: {}",
                        raw
                    )));
                };
                Ok(Self {
                    kind: ProviderKind::Ab,
                    selector: ArtifactSelector {
                        branch: Some(branch.to_string()),
                        target: Some(target.to_string()),
                        build_id: Some(build_id.to_string()),
                        artifact_name: Some(artifact_name.to_string()),
                        ..Default::default()
                    },
                })
            }
            // the literal cloud-storage scheme; the whole URL is the path
            "gs" => Ok(Self {
                kind: ProviderKind::Gcs,
                selector: ArtifactSelector {
                    path: Some(raw.to_string()),
                    ..Default::default()
                },
            }),
            other => Err(HostError::Argument(format!(
                "unsupported resource locator scheme {}: {}",
                other, raw
            ))),
        }
    }
}

/// Host plus path segments, the way locators are written.
fn locator_parts(url: &Url) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(host) = url.host_str() {
        parts.push(host.to_string());
    }
    if let Some(segments) = url.path_segments() {
        parts.extend(segments.filter(|s| !s.is_empty()).map(|s| s.to_string()));
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pab_locator() {
        let locator =
            ResourceLocator::parse("pab://5346564/oc-release/marlin-userdebug/4329875/artifact.img")
                .unwrap();
        assert_eq!(locator.kind, ProviderKind::Pab);
        assert_eq!(locator.selector.account_id.as_deref(), Some("5346564"));
        assert_eq!(locator.selector.branch.as_deref(), Some("oc-release"));
        assert_eq!(locator.selector.target.as_deref(), Some("marlin-userdebug"));
        assert_eq!(locator.selector.build_id.as_deref(), Some("4329875"));
        assert_eq!(
            locator.selector.artifact_name.as_deref(),
            Some("artifact.img")
        );
    }

    #[test]
    fn test_parse_ab_locator() {
        let locator =
            ResourceLocator::parse("ab://oc-release/marlin-userdebug/4329875/artifact.img")
                .unwrap();
        assert_eq!(locator.kind, ProviderKind::Ab);
        assert_eq!(locator.selector.branch.as_deref(), Some("oc-release"));
        assert!(locator.selector.account_id.is_none());
    }

    #[test]
    fn test_parse_gs_locator() {
        let locator = ResourceLocator::parse("gs://bucket/builds/123/img.zip").unwrap();
        assert_eq!(locator.kind, ProviderKind::Gcs);
        assert_eq!(
            locator.selector.path.as_deref(),
            Some("gs://bucket/builds/123/img.zip")
        );
    }

    #[test]
    fn test_wrong_segment_count_rejected() {
        let err = ResourceLocator::parse("pab://only/three/parts").unwrap_err();
        assert!(matches!(err, HostError::Argument(_)));

        let err = ResourceLocator::parse("ab://two/parts").unwrap_err();
        assert!(matches!(err, HostError::Argument(_)));
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let err = ResourceLocator::parse("ftp://host/file").unwrap_err();
        assert!(matches!(err, HostError::Argument(_)));
    }
}
