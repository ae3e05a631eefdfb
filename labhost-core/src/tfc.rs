//! Task-queue server client: execution requests, command-task leasing, and
//! host event submission.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{HostError, HostResult};

/// A request to execute a command on some run target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecRequest {
    pub cluster: String,
    pub run_target: String,
    pub user: String,
    pub command_line: String,
}

/// One command task leased by a host.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommandTask {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub command_id: String,
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub device_serials: Vec<String>,
    #[serde(default)]
    pub command_line: String,
}

/// One device row as known to the task server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeviceInfo {
    #[serde(default)]
    pub device_serial: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub run_target: String,
    #[serde(default)]
    pub build_id: String,
    #[serde(default)]
    pub sdk_version: String,
    #[serde(default)]
    pub stub: bool,
    #[serde(default)]
    pub sim_state: Option<String>,
    #[serde(default)]
    pub sim_operator: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
}

/// Snapshot of one host's devices at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostEvent {
    pub cluster: String,
    pub hostname: String,
    pub devices: Vec<DeviceInfo>,
}

#[derive(Debug, Deserialize)]
struct TaskListResponse {
    #[serde(default)]
    tasks: Vec<CommandTask>,
}

#[derive(Debug, Deserialize)]
struct DeviceListResponse {
    #[serde(default)]
    devices: Vec<DeviceInfo>,
}

/// Client for the task-queue server. Shared by every host handle; stateless
/// apart from the connection pool.
pub struct TaskClient {
    client: Client,
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit a new execution request.
    pub async fn new_request(&self, request: &ExecRequest) -> HostResult<()> {
        let url = format!("{}/requests/v1/new", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(HostError::RemoteRejected {
                endpoint: "requests/v1/new".to_string(),
                message: format!("status {}", response.status()),
            });
        }
        info!(cluster = %request.cluster, "execution request submitted");
        Ok(())
    }

    /// Lease pending command tasks for a host.
    pub async fn lease_command_tasks(&self, hostname: &str) -> HostResult<Vec<CommandTask>> {
        let url = format!("{}/tasks/v1/lease", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "hostname": hostname }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(HostError::RemoteRejected {
                endpoint: "tasks/v1/lease".to_string(),
                message: format!("status {}", response.status()),
            });
        }
        let list: TaskListResponse = response.json().await?;
        debug!(hostname, count = list.tasks.len(), "leased command tasks");
        Ok(list.tasks)
    }

    /// Devices the task server knows for a host.
    pub async fn list_devices(&self, hostname: &str) -> HostResult<Vec<DeviceInfo>> {
        let url = format!("{}/devices/v1/list", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("hostname", hostname)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(HostError::RemoteRejected {
                endpoint: "devices/v1/list".to_string(),
                message: format!("status {}", response.status()),
            });
        }
        let list: DeviceListResponse = response.json().await?;
        Ok(list.devices)
    }

    /// Submit host device snapshots.
    pub async fn submit_host_events(&self, events: &[HostEvent]) -> HostResult<()> {
        let url = format!("{}/host_events/v1/submit", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "host_events": events }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(HostError::RemoteRejected {
                endpoint: "host_events/v1/submit".to_string(),
                message: format!("status {}", response.status()),
            });
        }
        Ok(())
    }
}
