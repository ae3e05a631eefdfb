#![allow(
    clippy::needless_borrows_for_generic_args,
    clippy::manual_range_contains,
    clippy::type_complexity,
    clippy::ptr_arg,
    clippy::map_entry,
    clippy::len_zero,
    dead_code,
    unused_imports,
    unused_variables,
    unused_mut
)]

pub mod config;
pub mod device;
pub mod error;
pub mod fetch;
pub mod flash;
pub mod gsi;
pub mod host;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod tfc;
pub mod updates;

pub use config::{
    BuildServerConfig, HostConfig, HostEntry, SchedulerConfig, TaskServerConfig, ToolsConfig,
    DEFAULT_ACCOUNT_ID,
};
pub use device::{AttachedDevice, DeviceScanner, DeviceStatus};
pub use error::{HostError, HostResult};
pub use fetch::{
    locator::{ProviderKind, ResourceLocator},
    ArtifactSelector, ArtifactSet, BuildProvider, FetchMethod, GcsProvider, InternalBuildClient,
    LocalFsProvider, PartnerBuildClient, FULL_ZIPFILE,
};
pub use flash::{
    partition_map_from_defaults, partition_map_from_pairs, BuildFlasher, DEFAULT_FLASH_IMAGES,
};
pub use gsi::{respin_output_path, validate_spl_version, GsiTool};
pub use host::Host;
pub use scheduler::{
    flatten_schedules, BuildInfo, BuildTargetSchedule, LabConfig, LabHostConfig, LeasedJob,
    ScheduleConfig, ScheduleInfoRow, SchedulerClient, TestSchedule,
};
pub use session::{
    run_until_cancelled, CancelToken, Session, SessionRegistry, SessionState, SingleSession,
};
pub use state::{ConsoleState, FetchInfo, StateSnapshot, DEFAULT_TEST_SUITE};
pub use tfc::{CommandTask, DeviceInfo, ExecRequest, HostEvent, TaskClient};
pub use updates::{
    load_configs_from_dir, BuildUpdater, ConfigUpdater, DeviceUpdater, ServerType,
};
