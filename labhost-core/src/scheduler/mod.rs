//! Central scheduling endpoint: wire types and the JSON POST client.

mod client;

pub use client::SchedulerClient;

use serde::{Deserialize, Serialize};

/// One build row uploaded by a build update session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildInfo {
    pub manifest_branch: String,
    pub build_id: String,
    pub build_target: String,
    pub build_type: String,
    pub artifact_type: String,
    #[serde(default)]
    pub artifacts: Vec<String>,
}

/// Parsed `.schedule_config` file: which tests run against which targets of
/// a branch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    pub manifest_branch: String,
    #[serde(default)]
    pub build_target: Vec<BuildTargetSchedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildTargetSchedule {
    pub name: String,
    #[serde(default)]
    pub test_schedule: Vec<TestSchedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestSchedule {
    pub test_name: String,
    #[serde(default)]
    pub period: u32,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub device: Vec<String>,
    #[serde(default)]
    pub shards: u32,
    #[serde(default)]
    pub param: Vec<String>,
}

/// Parsed `.lab_config` file: one lab and its member hosts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabConfig {
    pub name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub host: Vec<LabHostConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabHostConfig {
    pub hostname: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub script: String,
}

/// One row of the flattened schedule upload; the endpoint takes one test
/// schedule per POST.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScheduleInfoRow {
    pub manifest_branch: String,
    pub build_target: Vec<String>,
    pub test_name: String,
    pub period: u32,
    pub priority: String,
    pub device: Vec<String>,
    pub shards: u32,
    pub param: Vec<String>,
}

/// Flatten parsed schedule configs into upload rows, one per
/// (branch, target, test) combination.
pub fn flatten_schedules(configs: &[ScheduleConfig]) -> Vec<ScheduleInfoRow> {
    let mut rows = Vec::new();
    for config in configs {
        for target in &config.build_target {
            for test in &target.test_schedule {
                rows.push(ScheduleInfoRow {
                    manifest_branch: config.manifest_branch.clone(),
                    build_target: vec![target.name.clone()],
                    test_name: test.test_name.clone(),
                    period: test.period,
                    priority: test.priority.clone(),
                    device: test.device.clone(),
                    shards: test.shards,
                    param: test.param.clone(),
                });
            }
        }
    }
    rows
}

/// A job leased from the scheduler's queue.
#[derive(Debug, Clone)]
pub struct LeasedJob {
    /// Suite name, the prefix of the job's `test_name`.
    pub suite: String,
    /// The full job payload as returned by the endpoint.
    pub job: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_schedules() {
        let configs = vec![ScheduleConfig {
            manifest_branch: "main".to_string(),
            build_target: vec![BuildTargetSchedule {
                name: "sailfish-userdebug".to_string(),
                test_schedule: vec![
                    TestSchedule {
                        test_name: "vts/vts-kernel".to_string(),
                        period: 24,
                        priority: "high".to_string(),
                        device: vec!["sailfish".to_string()],
                        shards: 2,
                        param: vec![],
                    },
                    TestSchedule {
                        test_name: "vts/vts-hal".to_string(),
                        period: 12,
                        priority: "low".to_string(),
                        device: vec![],
                        shards: 1,
                        param: vec!["--abi".to_string()],
                    },
                ],
            }],
        }];

        let rows = flatten_schedules(&configs);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].manifest_branch, "main");
        assert_eq!(rows[0].build_target, vec!["sailfish-userdebug"]);
        assert_eq!(rows[0].test_name, "vts/vts-kernel");
        assert_eq!(rows[1].test_name, "vts/vts-hal");
    }

    #[test]
    fn test_schedule_config_from_toml() {
        let raw = r#"
manifest_branch = "oc-release"

[[build_target]]
name = "marlin-userdebug"

[[build_target.test_schedule]]
test_name = "vts/vts-camera"
period = 24
priority = "medium"
device = ["marlin"]
shards = 1
"#;
        let config: ScheduleConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.manifest_branch, "oc-release");
        assert_eq!(config.build_target.len(), 1);
        assert_eq!(
            config.build_target[0].test_schedule[0].test_name,
            "vts/vts-camera"
        );
    }

    #[test]
    fn test_lab_config_from_toml() {
        let raw = r#"
name = "lab-west"
owner = "lab-admin@example.com"

[[host]]
hostname = "lab-host-01"
ip = "10.0.0.1"
script = "setup.sh"
"#;
        let config: LabConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.name, "lab-west");
        assert_eq!(config.host.len(), 1);
        assert_eq!(config.host[0].hostname, "lab-host-01");
    }
}
