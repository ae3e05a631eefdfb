use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::device::AttachedDevice;
use crate::error::{HostError, HostResult};

use super::{flatten_schedules, BuildInfo, LabConfig, LeasedJob, ScheduleConfig};

/// JSON POST client for the central scheduling endpoint.
pub struct SchedulerClient {
    client: Client,
    base_url: String,
}

impl SchedulerClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: normalize_url(url.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize>(&self, endpoint: &str, body: &B) -> HostResult<()> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HostError::RemoteRejected {
                endpoint: endpoint.to_string(),
                message: format!("status {}", status),
            });
        }
        Ok(())
    }

    /// Upload new builds, one POST per entry. Every entry is attempted;
    /// the first failure is reported after the rest have been tried.
    pub async fn upload_build_info(&self, builds: &[BuildInfo]) -> HostResult<()> {
        let mut first_err = None;
        for build in builds {
            if let Err(e) = self.post("build_info/v1/set", build).await {
                warn!(build_id = %build.build_id, "build info upload failed: {}", e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Upload the device list of one host.
    pub async fn upload_device_info(
        &self,
        hostname: &str,
        devices: &[AttachedDevice],
    ) -> HostResult<()> {
        let payload = json!({
            "hostname": hostname,
            "devices": devices,
        });
        self.post("host_info/v1/set", &payload).await
    }

    /// Replace the schedule table: clear, then one POST per flattened row.
    /// An empty config list is a no-op.
    pub async fn upload_schedule_info(&self, configs: &[ScheduleConfig]) -> HostResult<()> {
        if configs.is_empty() {
            debug!("no schedule configs to upload");
            return Ok(());
        }
        self.post("schedule_info/v1/clear", &json!({ "manifest_branch": "na" }))
            .await?;

        let mut first_err = None;
        for row in flatten_schedules(configs) {
            if let Err(e) = self.post("schedule_info/v1/set", &row).await {
                warn!(test = %row.test_name, "schedule upload failed: {}", e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Replace the lab table: clear, then one POST per lab.
    pub async fn upload_lab_info(&self, labs: &[LabConfig]) -> HostResult<()> {
        if labs.is_empty() {
            debug!("no lab configs to upload");
            return Ok(());
        }
        self.post("lab_info/v1/clear", &json!({ "name": "na" }))
            .await?;

        let mut first_err = None;
        for lab in labs {
            if let Err(e) = self.post("lab_info/v1/set", lab).await {
                warn!(lab = %lab.name, "lab upload failed: {}", e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Lease a pending job for this host. `Ok(None)` means the queue is
    /// empty; a responding endpoint that signals failure is distinct from a
    /// transport error.
    pub async fn lease_job(&self, hostname: &str) -> HostResult<Option<LeasedJob>> {
        if hostname.is_empty() {
            return Ok(None);
        }
        let url = format!("{}job_queue/v1/get", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "hostname": hostname }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HostError::RemoteRejected {
                endpoint: "job_queue/v1/get".to_string(),
                message: format!("status {}", status),
            });
        }

        let body: serde_json::Value = response.json().await?;
        if let Some(code) = body.get("return_code").and_then(|c| c.as_str()) {
            if code != "SUCCESS" {
                return Err(HostError::RemoteRejected {
                    endpoint: "job_queue/v1/get".to_string(),
                    message: format!("return_code {}", code),
                });
            }
        }

        let Some(jobs) = body.get("jobs").and_then(|j| j.as_array()) else {
            warn!("job lease response carried no jobs field");
            return Ok(None);
        };
        let Some(job) = jobs.first() else {
            return Ok(None);
        };
        let test_name = job
            .get("test_name")
            .and_then(|t| t.as_str())
            .unwrap_or_default();
        let suite = test_name.split('/').next().unwrap_or_default().to_string();
        Ok(Some(LeasedJob {
            suite,
            job: job.clone(),
        }))
    }
}

/// Normalize an endpoint URL the way operators write them: scheme-less
/// hostnames get https, appspot hosts get the API mount point, and the base
/// always ends with a slash so endpoint paths can be appended.
fn normalize_url(mut url: String) -> String {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        url = format!("https://{}", url);
    }
    if url.ends_with("appspot.com") {
        url.push_str("/_ah/api/");
    }
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
