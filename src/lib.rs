//! Host-Path Provisioner
//!
//! Dynamically provisions Kubernetes persistent volumes as directories on a
//! host filesystem, and deletes, retains or archives them when released.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 kube::runtime controllers (claims, volumes)          │
//! └───────────────┬─────────────────────────────────────┬───────────────┘
//!                 │ provision(claim, class)             │ delete(volume)
//!                 ▼                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Volume Lifecycle Engine (HostPath)                │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌─────────────────┐  │
//! │  │  Path Templates  │   │  Directory I/O   │   │ Reclaim Policy  │  │
//! │  └──────────────────┘   └──────────────────┘   └────────┬────────┘  │
//! └─────────────────────────────────────────────────────────┼───────────┘
//!                                                           ▼
//!                                          ┌──────────────────────────────┐
//!                                          │  Storage Class Lookup (port) │
//!                                          └──────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`provisioner`]: path templates and the volume lifecycle engine
//! - [`cluster`]: storage class lookup adapters
//! - [`controller`]: `kube::runtime` wiring for claims and volumes
//! - [`domain`]: port traits and request types
//! - [`metrics`]: Prometheus counters
//! - [`error`]: Error types and handling

pub mod cluster;
pub mod controller;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod provisioner;

// Re-export commonly used types
pub use cluster::{
    class_name_for_claim, class_name_for_volume, InMemoryStorageClasses, KubeStorageClassLookup,
};

pub use controller::{Context, ControllerConfig};

pub use domain::ports::{
    ProvisionOptions, ProvisionOutcome, Provisioner, ProvisionerRef, ProvisioningState,
    ReclaimPolicy, StorageClassLookup, StorageClassLookupRef,
};

pub use error::{Error, ErrorAction, Result};

pub use metrics::ProvisionerMetrics;

pub use provisioner::{
    HostPathProvisioner, PathTemplate, PathVariables, ProvisionerConfig, ResolvedPath,
    DEFAULT_PATH_TEMPLATE,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
