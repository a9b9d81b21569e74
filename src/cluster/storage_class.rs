//! Storage Class Lookup
//!
//! Resolves the storage class that owns a volume. Classes are fetched fresh
//! on every call so that parameter changes made after a volume was created
//! are honoured when it is reclaimed.

use crate::domain::ports::StorageClassLookup;
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::{Api, Client};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

/// Legacy annotation that takes precedence over `storageClassName`
pub const BETA_STORAGE_CLASS_ANNOTATION: &str = "volume.beta.kubernetes.io/storage-class";

/// Name of the storage class a volume belongs to, if any
pub fn class_name_for_volume(volume: &PersistentVolume) -> Option<&str> {
    let annotated = volume
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(BETA_STORAGE_CLASS_ANNOTATION));
    if let Some(name) = annotated {
        return non_empty(name);
    }

    volume
        .spec
        .as_ref()
        .and_then(|spec| spec.storage_class_name.as_deref())
        .and_then(non_empty)
}

/// Name of the storage class a claim asks for, if any
pub fn class_name_for_claim(claim: &PersistentVolumeClaim) -> Option<&str> {
    let annotated = claim
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(BETA_STORAGE_CLASS_ANNOTATION));
    if let Some(name) = annotated {
        return non_empty(name);
    }

    claim
        .spec
        .as_ref()
        .and_then(|spec| spec.storage_class_name.as_deref())
        .and_then(non_empty)
}

fn non_empty(name: &str) -> Option<&str> {
    (!name.is_empty()).then_some(name)
}

fn volume_name(volume: &PersistentVolume) -> String {
    volume.metadata.name.clone().unwrap_or_default()
}

// =============================================================================
// Kubernetes Lookup
// =============================================================================

/// Looks storage classes up through the Kubernetes API
#[derive(Clone)]
pub struct KubeStorageClassLookup {
    client: Option<Client>,
}

impl KubeStorageClassLookup {
    /// Create a lookup backed by an API client
    pub fn new(client: Client) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Create a lookup with no API client; every lookup fails
    pub fn disconnected() -> Self {
        Self { client: None }
    }

    /// Storage class API for resolving the class of `object`
    fn api(&self, object: &str) -> Result<Api<StorageClass>> {
        let client = self.client.clone().ok_or_else(|| Error::StorageClassLookup {
            object: object.to_string(),
            reason: "cannot get kube client".into(),
        })?;
        Ok(Api::all(client))
    }
}

#[async_trait]
impl StorageClassLookup for KubeStorageClassLookup {
    async fn get(&self, name: &str) -> Result<Option<StorageClass>> {
        Ok(self.api(name)?.get_opt(name).await?)
    }

    async fn class_for_volume(&self, volume: &PersistentVolume) -> Result<StorageClass> {
        let api = self.api(&volume_name(volume))?;
        let class_name = class_name_for_volume(volume).ok_or_else(|| Error::StorageClassLookup {
            object: volume_name(volume),
            reason: "volume has no storage class".into(),
        })?;

        debug!(volume = %volume_name(volume), class = class_name, "Fetching storage class");
        Ok(api.get(class_name).await?)
    }
}

// =============================================================================
// In-Memory Lookup
// =============================================================================

/// Storage classes held in memory, for standalone mode and tests
#[derive(Default)]
pub struct InMemoryStorageClasses {
    classes: RwLock<BTreeMap<String, StorageClass>>,
}

impl InMemoryStorageClasses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (multi-document) YAML manifest of storage classes.
    ///
    /// Documents of other kinds are skipped.
    pub fn from_yaml(manifest: &str) -> Result<Self> {
        let mut classes = BTreeMap::new();

        for document in serde_yaml::Deserializer::from_str(manifest) {
            let value = serde_yaml::Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            let kind = value.get("kind").and_then(|k| k.as_str());
            if kind.is_some_and(|k| k != "StorageClass") {
                continue;
            }

            let class: StorageClass = serde_yaml::from_value(value)?;
            let name = class.metadata.name.clone().ok_or_else(|| {
                Error::Configuration("storage class in manifest has no name".into())
            })?;
            classes.insert(name, class);
        }

        Ok(Self {
            classes: RwLock::new(classes),
        })
    }

    /// Load a YAML manifest of storage classes from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let manifest = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io("read storage class manifest", path, e))?;
        Self::from_yaml(&manifest)
    }

    /// Add or replace a storage class
    pub async fn insert(&self, class: StorageClass) {
        let name = class.metadata.name.clone().unwrap_or_default();
        self.classes.write().await.insert(name, class);
    }

    pub async fn len(&self) -> usize {
        self.classes.read().await.len()
    }
}

#[async_trait]
impl StorageClassLookup for InMemoryStorageClasses {
    async fn get(&self, name: &str) -> Result<Option<StorageClass>> {
        Ok(self.classes.read().await.get(name).cloned())
    }

    async fn class_for_volume(&self, volume: &PersistentVolume) -> Result<StorageClass> {
        let class_name = class_name_for_volume(volume).ok_or_else(|| Error::StorageClassLookup {
            object: volume_name(volume),
            reason: "volume has no storage class".into(),
        })?;

        self.get(class_name)
            .await?
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "StorageClass".into(),
                name: class_name.into(),
            })
    }
}
