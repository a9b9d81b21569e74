//! Domain Ports - Core trait definitions for the provisioner
//!
//! These traits define the boundaries between the lifecycle engine and the
//! controller runtime that drives it. Adapters implement these traits to
//! provide concrete functionality.

use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use k8s_openapi::api::storage::v1::StorageClass;
use std::sync::Arc;

// =============================================================================
// Provisioning Request/Outcome
// =============================================================================

/// Everything the engine needs to provision one claim
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    /// The claim being satisfied
    pub claim: PersistentVolumeClaim,
    /// The storage class the claim refers to
    pub storage_class: StorageClass,
    /// Name the published volume will carry
    pub volume_name: String,
}

impl ProvisionOptions {
    /// Create provisioning options for a claim
    pub fn new(
        claim: PersistentVolumeClaim,
        storage_class: StorageClass,
        volume_name: impl Into<String>,
    ) -> Self {
        Self {
            claim,
            storage_class,
            volume_name: volume_name.into(),
        }
    }

    /// Namespace of the claim (empty when unset)
    pub fn claim_namespace(&self) -> &str {
        self.claim.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// Name of the claim (empty when unset)
    pub fn claim_name(&self) -> &str {
        self.claim.metadata.name.as_deref().unwrap_or_default()
    }

    /// `namespace/name` of the claim, used in log lines and errors
    pub fn claim_key(&self) -> String {
        format!("{}/{}", self.claim_namespace(), self.claim_name())
    }

    /// Look up a storage class parameter
    pub fn class_parameter(&self, key: &str) -> Option<&str> {
        self.storage_class
            .parameters
            .as_ref()
            .and_then(|params| params.get(key))
            .map(String::as_str)
    }

    /// Look up a claim annotation
    pub fn claim_annotation(&self, key: &str) -> Option<&str> {
        self.claim
            .metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
    }
}

/// Provisioning state reported back to the controller runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisioningState {
    /// The attempt is over, successful or not; nothing runs in the background
    Finished,
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProvisioningState::Finished => write!(f, "finished"),
        }
    }
}

/// Successful provisioning result
#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    /// The volume record to publish
    pub volume: PersistentVolume,
    /// State of the attempt
    pub state: ProvisioningState,
}

// =============================================================================
// Reclaim Policy
// =============================================================================

/// What happens to a volume's backing directory when the volume is released.
///
/// Read from the owning storage class's `reclaimPolicy` parameter at delete
/// time, never from the class's native reclaim policy field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReclaimPolicy {
    /// Remove the directory and everything beneath it
    Delete,
    /// Leave the directory untouched
    Retain,
    /// Move the directory under the archive subtree
    #[default]
    Archive,
}

impl ReclaimPolicy {
    /// Parse the class parameter; anything unrecognised archives
    pub fn from_parameter(value: Option<&str>) -> Self {
        match value {
            Some("delete") => ReclaimPolicy::Delete,
            Some("retain") => ReclaimPolicy::Retain,
            _ => ReclaimPolicy::Archive,
        }
    }
}

impl std::fmt::Display for ReclaimPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReclaimPolicy::Delete => write!(f, "delete"),
            ReclaimPolicy::Retain => write!(f, "retain"),
            ReclaimPolicy::Archive => write!(f, "archive"),
        }
    }
}

// =============================================================================
// Provisioner Port
// =============================================================================

/// Port implemented by the volume lifecycle engine and driven by the runtime
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create backing storage for a claim and return the volume to publish
    async fn provision(&self, options: &ProvisionOptions) -> Result<ProvisionOutcome>;

    /// Reclaim the backing storage of a released volume
    async fn delete(&self, volume: &PersistentVolume) -> Result<()>;

    /// Name under which this provisioner serves storage classes
    fn provisioner_name(&self) -> &str;
}

// =============================================================================
// Storage Class Lookup Port
// =============================================================================

/// Port for resolving storage classes from the cluster's object store
#[async_trait]
pub trait StorageClassLookup: Send + Sync {
    /// Fetch a storage class by name, `None` when it does not exist
    async fn get(&self, name: &str) -> Result<Option<StorageClass>>;

    /// Fetch the storage class that owns a volume
    async fn class_for_volume(&self, volume: &PersistentVolume) -> Result<StorageClass>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ProvisionerRef = Arc<dyn Provisioner>;
pub type StorageClassLookupRef = Arc<dyn StorageClassLookup>;
