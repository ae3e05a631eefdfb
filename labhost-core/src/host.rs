use std::sync::Arc;

use crate::error::HostResult;
use crate::tfc::{CommandTask, DeviceInfo, TaskClient};

/// One lab machine capable of listing attached devices and leasing command
/// tasks. Created at startup from configuration; the console only indexes
/// into the list it is given.
pub struct Host {
    hostname: String,
    cluster_ids: Vec<String>,
    tasks: Arc<TaskClient>,
}

impl Host {
    pub fn new(
        hostname: impl Into<String>,
        cluster_ids: Vec<String>,
        tasks: Arc<TaskClient>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            cluster_ids,
            tasks,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// First cluster this host belongs to, used for device snapshots.
    pub fn primary_cluster(&self) -> &str {
        self.cluster_ids.first().map(String::as_str).unwrap_or("")
    }

    pub async fn list_devices(&self) -> HostResult<Vec<DeviceInfo>> {
        self.tasks.list_devices(&self.hostname).await
    }

    pub async fn lease_command_tasks(&self) -> HostResult<Vec<CommandTask>> {
        self.tasks.lease_command_tasks(&self.hostname).await
    }
}
