//! Volume Provisioning
//!
//! The path resolver and the host-path volume lifecycle engine:
//! - `template`: expands path templates into relative volume paths
//! - `hostpath`: creates volume directories and reclaims them on release
//! - `reclaim`: the delete / retain / archive actions

pub mod config;
pub mod hostpath;
pub mod reclaim;
pub mod template;

pub use config::*;
pub use hostpath::*;
pub use reclaim::*;
pub use template::*;

/// Storage class parameter holding the path template
pub const PATH_TEMPLATE_PARAMETER: &str = "pvPathTemplate";

/// Storage class parameter holding the reclaim policy
pub const RECLAIM_POLICY_PARAMETER: &str = "reclaimPolicy";

/// Claim annotation overriding the class's mount options
pub const MOUNT_OPTIONS_ANNOTATION: &str = "mount-options";

/// Volume annotation recording the resolved relative path
pub const PV_PATH_ANNOTATION: &str = "provisioner/pvPath";

/// Volume annotation recording the host root used at creation time
pub const HOST_DIR_ANNOTATION: &str = "provisioner/hostDir";
