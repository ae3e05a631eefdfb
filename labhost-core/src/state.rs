//! Shared console state.
//!
//! One instance is shared between the foreground command handlers and every
//! background update session, so each map sits behind its own lock. Locks
//! are only taken for the duration of a read or merge and are never held
//! across await points.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::fetch::ArtifactSet;

/// Key the `test` command falls back to when no suite is named.
pub const DEFAULT_TEST_SUITE: &str = "vts";

/// Metadata about the most recent fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchInfo {
    pub build_id: Option<String>,
    pub branch: Option<String>,
    pub target: Option<String>,
}

/// Printable copy of the whole state, for the `info` command.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    pub device_images: HashMap<String, PathBuf>,
    pub test_suites: HashMap<String, PathBuf>,
    pub tools: HashMap<String, PathBuf>,
    pub fetch_info: FetchInfo,
    pub serials: Vec<String>,
}

/// The mutable maps shared by commands and background sessions.
#[derive(Debug, Default)]
pub struct ConsoleState {
    device_images: RwLock<HashMap<String, PathBuf>>,
    test_suites: RwLock<HashMap<String, PathBuf>>,
    tools: RwLock<HashMap<String, PathBuf>>,
    fetch_info: RwLock<FetchInfo>,
    serials: RwLock<Vec<String>>,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetch result into the state. The merge is accumulative: only
    /// keys reported by this fetch are overwritten, unrelated entries stay.
    pub fn merge_artifacts(&self, set: ArtifactSet) {
        if !set.device_images.is_empty() {
            self.device_images.write().unwrap().extend(set.device_images);
        }
        if !set.test_suites.is_empty() {
            self.test_suites.write().unwrap().extend(set.test_suites);
        }
        if !set.tools.is_empty() {
            self.tools.write().unwrap().extend(set.tools);
        }
    }

    /// Record which selector the last fetch ran with.
    pub fn record_fetch(
        &self,
        build_id: Option<String>,
        branch: Option<String>,
        target: Option<String>,
    ) {
        let mut info = self.fetch_info.write().unwrap();
        info.build_id = build_id;
        info.branch = branch;
        info.target = target;
    }

    pub fn device_image(&self, name: &str) -> Option<PathBuf> {
        self.device_images.read().unwrap().get(name).cloned()
    }

    pub fn device_images(&self) -> HashMap<String, PathBuf> {
        self.device_images.read().unwrap().clone()
    }

    /// Point an image name at a new path (used after a GSI respin).
    pub fn set_device_image(&self, name: &str, path: impl AsRef<Path>) {
        self.device_images
            .write()
            .unwrap()
            .insert(name.to_string(), path.as_ref().to_path_buf());
    }

    pub fn test_suite(&self, name: &str) -> Option<PathBuf> {
        self.test_suites.read().unwrap().get(name).cloned()
    }

    pub fn tool(&self, name: &str) -> Option<PathBuf> {
        self.tools.read().unwrap().get(name).cloned()
    }

    /// Replace the selected-serials list wholesale.
    pub fn set_serials(&self, serials: Vec<String>) {
        *self.serials.write().unwrap() = serials;
    }

    pub fn serials(&self) -> Vec<String> {
        self.serials.read().unwrap().clone()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            device_images: self.device_images.read().unwrap().clone(),
            test_suites: self.test_suites.read().unwrap().clone(),
            tools: self.tools.read().unwrap().clone(),
            fetch_info: self.fetch_info.read().unwrap().clone(),
            serials: self.serials.read().unwrap().clone(),
        }
    }
}
