//! Host-Path Volume Lifecycle Engine
//!
//! Creates one directory per claim beneath the storage root and publishes a
//! `hostPath` volume pointing at the same directory as seen from the node.
//! On release the directory is deleted, retained or archived according to
//! the owning storage class's `reclaimPolicy` parameter, which is re-read on
//! every delete.

use crate::domain::ports::{
    ProvisionOptions, ProvisionOutcome, Provisioner, ProvisioningState, ReclaimPolicy,
    StorageClassLookupRef,
};
use crate::error::{Error, Result};
use crate::provisioner::config::{ProvisionerConfig, ARCHIVE_DIR_NAME};
use crate::provisioner::reclaim::reclaim;
use crate::provisioner::template::{PathTemplate, PathVariables, ResolvedPath};
use crate::provisioner::{
    HOST_DIR_ANNOTATION, MOUNT_OPTIONS_ANNOTATION, PATH_TEMPLATE_PARAMETER, PV_PATH_ANNOTATION,
    RECLAIM_POLICY_PARAMETER,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    HostPathVolumeSource, PersistentVolume, PersistentVolumeSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Mode applied to every volume directory
pub const VOLUME_DIR_MODE: u32 = 0o777;

/// Host-path type published on every volume
pub const HOST_PATH_TYPE: &str = "Directory";

/// Native reclaim policy used when a storage class leaves it unset
const DEFAULT_NATIVE_RECLAIM_POLICY: &str = "Delete";

/// Requested-capacity key on claims and volumes
const STORAGE_RESOURCE: &str = "storage";

// =============================================================================
// Host-Path Provisioner
// =============================================================================

/// Provisions directories on a host filesystem mounted into the provisioner
pub struct HostPathProvisioner {
    config: ProvisionerConfig,
    classes: StorageClassLookupRef,
}

impl HostPathProvisioner {
    /// Create a new provisioner
    pub fn new(config: ProvisionerConfig, classes: StorageClassLookupRef) -> Self {
        Self { config, classes }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Variables a path template may reference for this request
    pub fn path_variables(&self, options: &ProvisionOptions) -> PathVariables {
        let mut variables = PathVariables::new();
        variables.insert("provisioner", options.storage_class.provisioner.clone());
        variables.insert(
            "pvcUid",
            options.claim.metadata.uid.clone().unwrap_or_default(),
        );
        variables.insert("namespace", options.claim_namespace());
        variables.insert("pvcName", options.claim_name());
        variables.insert("pvName", options.volume_name.clone());

        if let Some(annotations) = &options.claim.metadata.annotations {
            variables.extend_from_annotations(annotations);
        }
        variables
    }

    /// Recover the relative path and host root a volume was created with.
    ///
    /// Annotations win; without them the host root falls back to the current
    /// configuration and the path is derived from the published host path.
    pub fn recover_path(&self, volume: &PersistentVolume) -> Result<(ResolvedPath, PathBuf)> {
        let annotations = volume.metadata.annotations.as_ref();

        let host_dir = annotations
            .and_then(|a| a.get(HOST_DIR_ANNOTATION))
            .map(PathBuf::from)
            .unwrap_or_else(|| self.config.host_dir.clone());

        if let Some(path) = annotations.and_then(|a| a.get(PV_PATH_ANNOTATION)) {
            return Ok((ResolvedPath::new(path.clone())?, host_dir));
        }

        let mount_path = volume
            .spec
            .as_ref()
            .and_then(|spec| spec.host_path.as_ref())
            .map(|host_path| host_path.path.replace('\\', "/"))
            .ok_or_else(|| {
                Error::InvalidRequest(format!(
                    "volume {} has neither a path annotation nor a host path",
                    volume.metadata.name.as_deref().unwrap_or_default()
                ))
            })?;

        let relative = match Path::new(&mount_path).strip_prefix(&host_dir) {
            Ok(rest) => rest.to_string_lossy().into_owned(),
            Err(_) => mount_path,
        };
        Ok((ResolvedPath::new(relative)?, host_dir))
    }

    /// Archive destination mirroring `relative` beneath the archive subtree
    pub fn archive_path(&self, relative: &ResolvedPath) -> PathBuf {
        relative.under(&self.config.archive_root())
    }

    fn build_volume(
        &self,
        options: &ProvisionOptions,
        relative: &ResolvedPath,
        host_path: &Path,
    ) -> PersistentVolume {
        let claim_spec = options.claim.spec.as_ref();

        let mut annotations = BTreeMap::new();
        annotations.insert(PV_PATH_ANNOTATION.to_string(), relative.as_str().to_string());
        annotations.insert(
            HOST_DIR_ANNOTATION.to_string(),
            self.config.host_dir.to_string_lossy().into_owned(),
        );

        let capacity = claim_spec
            .and_then(|spec| spec.resources.as_ref())
            .and_then(|resources| resources.requests.as_ref())
            .and_then(|requests| requests.get(STORAGE_RESOURCE))
            .map(|quantity| BTreeMap::from([(STORAGE_RESOURCE.to_string(), quantity.clone())]));

        let reclaim_policy = options
            .storage_class
            .reclaim_policy
            .clone()
            .unwrap_or_else(|| DEFAULT_NATIVE_RECLAIM_POLICY.to_string());

        PersistentVolume {
            metadata: ObjectMeta {
                name: Some(options.volume_name.clone()),
                namespace: options.claim.metadata.namespace.clone(),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec: Some(PersistentVolumeSpec {
                persistent_volume_reclaim_policy: Some(reclaim_policy),
                access_modes: claim_spec.and_then(|spec| spec.access_modes.clone()),
                mount_options: mount_options(options),
                capacity,
                host_path: Some(HostPathVolumeSource {
                    path: host_path.to_string_lossy().into_owned(),
                    type_: Some(HOST_PATH_TYPE.to_string()),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// A non-empty claim annotation replaces the class's mount options
fn mount_options(options: &ProvisionOptions) -> Option<Vec<String>> {
    match options.claim_annotation(MOUNT_OPTIONS_ANNOTATION) {
        Some(override_options) if !override_options.is_empty() => {
            Some(vec![override_options.to_string()])
        }
        _ => options.storage_class.mount_options.clone(),
    }
}

/// Create the volume directory tree and force its mode.
///
/// The explicit chmod covers directories that already existed and the
/// process umask.
async fn create_volume_dir(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true).mode(VOLUME_DIR_MODE);
    builder
        .create(path)
        .await
        .map_err(|e| Error::io("create directory", path, e))?;

    fs::set_permissions(path, std::fs::Permissions::from_mode(VOLUME_DIR_MODE))
        .await
        .map_err(|e| Error::io("set permissions on", path, e))
}

fn claim_key_for(volume: &PersistentVolume) -> String {
    let claim_ref = volume.spec.as_ref().and_then(|spec| spec.claim_ref.as_ref());
    format!(
        "{}/{}",
        claim_ref
            .and_then(|r| r.namespace.as_deref())
            .unwrap_or_default(),
        claim_ref.and_then(|r| r.name.as_deref()).unwrap_or_default()
    )
}

#[async_trait]
impl Provisioner for HostPathProvisioner {
    async fn provision(&self, options: &ProvisionOptions) -> Result<ProvisionOutcome> {
        let claim = options.claim_key();

        let has_selector = options
            .claim
            .spec
            .as_ref()
            .is_some_and(|spec| spec.selector.is_some());
        if has_selector {
            return Err(Error::SelectorNotSupported { claim });
        }

        debug!(
            claim = %claim,
            volume = %options.volume_name,
            class = options.storage_class.metadata.name.as_deref().unwrap_or_default(),
            "Provisioning volume"
        );

        let template = PathTemplate::from_parameter(options.class_parameter(PATH_TEMPLATE_PARAMETER));
        let relative = template
            .resolve(&self.path_variables(options))
            .map_err(|e| {
                warn!(
                    claim = %claim,
                    template = %template,
                    variables = ?template.variable_names(),
                    error = %e,
                    "Cannot resolve volume path"
                );
                e
            })?;

        if relative.first_component() == Some(ARCHIVE_DIR_NAME) {
            return Err(Error::ReservedPath {
                path: relative.to_string(),
                reserved: ARCHIVE_DIR_NAME.to_string(),
            });
        }

        let local_path = relative.under(&self.config.storage_root);
        let host_path = relative.under(&self.config.host_dir);

        debug!(claim = %claim, path = %local_path.display(), "Creating volume directory");
        create_volume_dir(&local_path).await?;

        info!(
            claim = %claim,
            volume = %options.volume_name,
            path = %host_path.display(),
            "Provisioned host path volume"
        );

        Ok(ProvisionOutcome {
            volume: self.build_volume(options, &relative, &host_path),
            state: ProvisioningState::Finished,
        })
    }

    async fn delete(&self, volume: &PersistentVolume) -> Result<()> {
        let claim = claim_key_for(volume);
        let volume_name = volume.metadata.name.as_deref().unwrap_or_default();

        let (relative, _host_dir) = self.recover_path(volume)?;
        let path = relative.under(&self.config.storage_root);

        if let Err(e) = fs::metadata(&path).await {
            if e.kind() == ErrorKind::NotFound {
                warn!(
                    claim = %claim,
                    volume = volume_name,
                    path = %path.display(),
                    "Volume path does not exist, nothing to reclaim"
                );
                return Ok(());
            }
        }

        let class = self.classes.class_for_volume(volume).await?;
        let policy = ReclaimPolicy::from_parameter(
            class
                .parameters
                .as_ref()
                .and_then(|params| params.get(RECLAIM_POLICY_PARAMETER))
                .map(String::as_str),
        );

        info!(
            claim = %claim,
            volume = volume_name,
            policy = %policy,
            path = %path.display(),
            "Reclaiming volume"
        );
        reclaim(policy, &path, &self.archive_path(&relative)).await
    }

    fn provisioner_name(&self) -> &str {
        &self.config.provisioner_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{InMemoryStorageClasses, KubeStorageClassLookup};
    use assert_matches::assert_matches;
    use k8s_openapi::api::core::v1::PersistentVolumeClaim;
    use k8s_openapi::api::storage::v1::StorageClass;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    const HOST_DIR: &str = "/data/k8s";
    const PROVISIONER: &str = "example.com/hostpath";

    struct Fixture {
        _tmp: TempDir,
        root: PathBuf,
        classes: Arc<InMemoryStorageClasses>,
        provisioner: HostPathProvisioner,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        let classes = Arc::new(InMemoryStorageClasses::new());
        let config = ProvisionerConfig::new(PROVISIONER, HOST_DIR)
            .unwrap()
            .with_storage_root(&root);
        let provisioner = HostPathProvisioner::new(config, classes.clone());
        Fixture {
            _tmp: tmp,
            root,
            classes,
            provisioner,
        }
    }

    fn class(name: &str, parameters: serde_json::Value) -> StorageClass {
        serde_json::from_value(json!({
            "metadata": { "name": name },
            "provisioner": PROVISIONER,
            "parameters": parameters,
            "mountOptions": ["nfsvers=4.1"],
            "reclaimPolicy": "Delete"
        }))
        .unwrap()
    }

    fn claim(annotations: serde_json::Value) -> PersistentVolumeClaim {
        serde_json::from_value(json!({
            "metadata": {
                "namespace": "ns1",
                "name": "claim-a",
                "uid": "0b7c-11",
                "annotations": annotations
            },
            "spec": {
                "accessModes": ["ReadWriteOnce"],
                "storageClassName": "local",
                "resources": { "requests": { "storage": "1Gi" } }
            }
        }))
        .unwrap()
    }

    /// Stamp the fields the controller runtime adds before publishing
    fn published(mut volume: PersistentVolume, class_name: &str) -> PersistentVolume {
        if let Some(spec) = volume.spec.as_mut() {
            spec.storage_class_name = Some(class_name.to_string());
        }
        volume
    }

    async fn provision_with(
        fx: &Fixture,
        parameters: serde_json::Value,
        annotations: serde_json::Value,
    ) -> Result<PersistentVolume> {
        let class = class("local", parameters);
        fx.classes.insert(class.clone()).await;
        let options = ProvisionOptions::new(claim(annotations), class, "pvc-123");
        let outcome = fx.provisioner.provision(&options).await?;
        assert_eq!(outcome.state, ProvisioningState::Finished);
        Ok(published(outcome.volume, "local"))
    }

    /// Same configuration, but storage classes cannot be fetched
    fn disconnected(fx: &Fixture) -> HostPathProvisioner {
        HostPathProvisioner::new(
            fx.provisioner.config().clone(),
            Arc::new(KubeStorageClassLookup::disconnected()),
        )
    }

    async fn set_policy(fx: &Fixture, policy: &str) {
        fx.classes
            .insert(class("local", json!({ "reclaimPolicy": policy })))
            .await;
    }

    #[tokio::test]
    async fn test_provision_default_template() {
        let fx = fixture();

        let pv = provision_with(&fx, json!({}), json!({})).await.unwrap();

        let dir = fx.root.join("ns1-claim-a-pvc-123");
        assert!(dir.is_dir());
        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, VOLUME_DIR_MODE);

        let annotations = pv.metadata.annotations.clone().unwrap();
        assert_eq!(annotations[PV_PATH_ANNOTATION], "ns1-claim-a-pvc-123");
        assert_eq!(annotations[HOST_DIR_ANNOTATION], HOST_DIR);
        assert_eq!(pv.metadata.name.as_deref(), Some("pvc-123"));
        assert_eq!(pv.metadata.namespace.as_deref(), Some("ns1"));

        let spec = pv.spec.unwrap();
        let host_path = spec.host_path.unwrap();
        assert_eq!(host_path.path, "/data/k8s/ns1-claim-a-pvc-123");
        assert_eq!(host_path.type_.as_deref(), Some("Directory"));
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        assert_eq!(spec.mount_options, Some(vec!["nfsvers=4.1".to_string()]));
        assert_eq!(spec.capacity.unwrap()["storage"].0, "1Gi");
        assert_eq!(spec.persistent_volume_reclaim_policy.as_deref(), Some("Delete"));
    }

    #[tokio::test]
    async fn test_provision_annotation_variables_and_mount_override() {
        let fx = fixture();

        let pv = provision_with(
            &fx,
            json!({ "pvPathTemplate": "{region}/{namespace}/{pvcName}" }),
            json!({ "pv-path-var/region": "us-east", "mount-options": "noatime" }),
        )
        .await
        .unwrap();

        assert!(fx.root.join("us-east/ns1/claim-a").is_dir());
        let spec = pv.spec.unwrap();
        assert_eq!(spec.host_path.unwrap().path, "/data/k8s/us-east/ns1/claim-a");
        assert_eq!(spec.mount_options, Some(vec!["noatime".to_string()]));
    }

    #[tokio::test]
    async fn test_provision_uses_uid_and_provisioner_variables() {
        let fx = fixture();

        let pv = provision_with(&fx, json!({ "pvPathTemplate": "{pvcUid}" }), json!({}))
            .await
            .unwrap();
        assert!(fx.root.join("0b7c-11").is_dir());
        assert_eq!(pv.metadata.annotations.unwrap()[PV_PATH_ANNOTATION], "0b7c-11");

        let variables = fx.provisioner.path_variables(&ProvisionOptions::new(
            claim(json!({})),
            class("local", json!({})),
            "pvc-9",
        ));
        assert_eq!(variables.get("provisioner"), Some(PROVISIONER));
    }

    #[tokio::test]
    async fn test_provision_existing_directory_gets_mode() {
        let fx = fixture();
        let dir = fx.root.join("ns1-claim-a-pvc-123");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700)).unwrap();

        provision_with(&fx, json!({}), json!({})).await.unwrap();

        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, VOLUME_DIR_MODE);
    }

    #[tokio::test]
    async fn test_provision_rejects_selector() {
        let fx = fixture();
        let mut claim = claim(json!({}));
        claim.spec.as_mut().unwrap().selector = Some(Default::default());
        let options = ProvisionOptions::new(claim, class("local", json!({})), "pvc-123");

        let err = fx.provisioner.provision(&options).await.unwrap_err();

        assert_matches!(err, Error::SelectorNotSupported { .. });
        assert_eq!(err.provisioning_state(), ProvisioningState::Finished);
        assert!(!err.is_retryable());
        assert_eq!(std::fs::read_dir(&fx.root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_provision_rejects_empty_path() {
        let fx = fixture();

        let err = provision_with(&fx, json!({ "pvPathTemplate": "" }), json!({}))
            .await
            .unwrap_err();

        assert_matches!(err, Error::EmptyPath { .. });
        assert!(!err.is_retryable());
        assert_eq!(std::fs::read_dir(&fx.root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_provision_rejects_unresolved_variable() {
        let fx = fixture();

        let err = provision_with(&fx, json!({ "pvPathTemplate": "{zone}/{pvName}" }), json!({}))
            .await
            .unwrap_err();

        assert_matches!(err, Error::UnresolvedVariable { ref variable, .. } if variable == "zone");
        assert_eq!(std::fs::read_dir(&fx.root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_provision_rejects_archive_subtree() {
        let fx = fixture();

        for template in ["archived", "archived/{pvName}", "/archived/{namespace}"] {
            let err = provision_with(&fx, json!({ "pvPathTemplate": template }), json!({}))
                .await
                .unwrap_err();

            assert_matches!(err, Error::ReservedPath { ref reserved, .. } if reserved == "archived");
            assert!(!err.is_retryable());
        }
        assert_eq!(std::fs::read_dir(&fx.root).unwrap().count(), 0);

        provision_with(&fx, json!({ "pvPathTemplate": "archived-{pvName}" }), json!({}))
            .await
            .unwrap();
        assert!(fx.root.join("archived-pvc-123").is_dir());
    }

    #[tokio::test]
    async fn test_provision_mkdir_failure_is_finished_io_error() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("rootfile");
        std::fs::write(&root, b"not a directory").unwrap();
        let config = ProvisionerConfig::new(PROVISIONER, HOST_DIR)
            .unwrap()
            .with_storage_root(&root);
        let provisioner =
            HostPathProvisioner::new(config, Arc::new(InMemoryStorageClasses::new()));
        let options = ProvisionOptions::new(claim(json!({})), class("local", json!({})), "pvc-123");

        let result = provisioner.provision(&options).await;

        let err = result.unwrap_err();
        assert_matches!(
            err,
            Error::Io { op: "create directory", ref path, .. } if path == &root.join("ns1-claim-a-pvc-123")
        );
        assert_eq!(err.provisioning_state(), ProvisioningState::Finished);
        assert!(std::fs::metadata(&root).unwrap().is_file());
    }

    #[tokio::test]
    async fn test_archive_parent_failure_keeps_volume() {
        let fx = fixture();
        let pv = provision_with(
            &fx,
            json!({ "pvPathTemplate": "{namespace}/{pvcName}" }),
            json!({}),
        )
        .await
        .unwrap();
        std::fs::write(fx.root.join("archived"), b"in the way").unwrap();

        let err = fx.provisioner.delete(&pv).await.unwrap_err();

        assert_matches!(err, Error::Io { op: "create archive directory", .. });
        assert!(fx.root.join("ns1/claim-a").is_dir());
    }

    #[tokio::test]
    async fn test_archive_rename_failure_keeps_volume() {
        let fx = fixture();
        let pv = provision_with(&fx, json!({}), json!({})).await.unwrap();
        let occupied = fx.root.join("archived/ns1-claim-a-pvc-123");
        std::fs::create_dir_all(&occupied).unwrap();
        std::fs::write(occupied.join("earlier"), b"x").unwrap();

        let err = fx.provisioner.delete(&pv).await.unwrap_err();

        assert_matches!(err, Error::Io { op: "archive", .. });
        assert!(fx.root.join("ns1-claim-a-pvc-123").is_dir());
        assert!(occupied.join("earlier").is_file());
    }

    #[tokio::test]
    async fn test_delete_policy_delete() {
        let fx = fixture();
        let pv = provision_with(&fx, json!({}), json!({})).await.unwrap();
        let dir = fx.root.join("ns1-claim-a-pvc-123");
        std::fs::write(dir.join("data"), b"x").unwrap();

        set_policy(&fx, "delete").await;
        fx.provisioner.delete(&pv).await.unwrap();

        assert!(!dir.exists());
        assert!(!fx.root.join("archived").exists());
    }

    #[tokio::test]
    async fn test_delete_policy_retain() {
        let fx = fixture();
        let pv = provision_with(&fx, json!({}), json!({})).await.unwrap();

        set_policy(&fx, "retain").await;
        fx.provisioner.delete(&pv).await.unwrap();

        assert!(fx.root.join("ns1-claim-a-pvc-123").is_dir());
    }

    #[tokio::test]
    async fn test_delete_default_archives() {
        let fx = fixture();
        let pv = provision_with(
            &fx,
            json!({ "pvPathTemplate": "{namespace}/{pvcName}" }),
            json!({}),
        )
        .await
        .unwrap();
        std::fs::write(fx.root.join("ns1/claim-a/data"), b"x").unwrap();

        fx.provisioner.delete(&pv).await.unwrap();

        assert!(!fx.root.join("ns1/claim-a").exists());
        assert!(fx.root.join("archived/ns1/claim-a/data").is_file());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let fx = fixture();
        let pv = provision_with(&fx, json!({}), json!({})).await.unwrap();

        fx.provisioner.delete(&pv).await.unwrap();
        let archived = fx.root.join("archived/ns1-claim-a-pvc-123");
        assert!(archived.is_dir());

        // No API client: the second call must not need the class.
        let provisioner = disconnected(&fx);
        provisioner.delete(&pv).await.unwrap();
        assert!(archived.is_dir());
    }

    #[tokio::test]
    async fn test_policy_is_read_at_delete_time() {
        let fx = fixture();
        let pv = provision_with(&fx, json!({ "reclaimPolicy": "retain" }), json!({}))
            .await
            .unwrap();

        set_policy(&fx, "delete").await;
        fx.provisioner.delete(&pv).await.unwrap();

        assert!(!fx.root.join("ns1-claim-a-pvc-123").exists());
    }

    #[tokio::test]
    async fn test_delete_without_client_fails_and_keeps_directory() {
        let fx = fixture();
        let pv = provision_with(&fx, json!({}), json!({})).await.unwrap();
        let provisioner = disconnected(&fx);

        let err = provisioner.delete(&pv).await.unwrap_err();

        assert_matches!(err, Error::StorageClassLookup { .. });
        assert!(fx.root.join("ns1-claim-a-pvc-123").is_dir());
    }

    #[tokio::test]
    async fn test_delete_without_class_name_fails() {
        let fx = fixture();
        let mut pv = provision_with(&fx, json!({}), json!({})).await.unwrap();
        pv.spec.as_mut().unwrap().storage_class_name = None;

        let err = fx.provisioner.delete(&pv).await.unwrap_err();
        assert_matches!(err, Error::StorageClassLookup { .. });
    }

    #[tokio::test]
    async fn test_recover_path_from_host_path() {
        let fx = fixture();
        let pv = provision_with(
            &fx,
            json!({ "pvPathTemplate": "{namespace}/{pvcName}" }),
            json!({}),
        )
        .await
        .unwrap();

        let mut stripped = pv.clone();
        stripped.metadata.annotations = None;

        let (from_annotations, _) = fx.provisioner.recover_path(&pv).unwrap();
        let (from_host_path, host_dir) = fx.provisioner.recover_path(&stripped).unwrap();
        assert_eq!(host_dir, PathBuf::from(HOST_DIR));
        assert_eq!(
            from_host_path.under(&fx.root),
            from_annotations.under(&fx.root)
        );
        assert_eq!(from_host_path.under(&fx.root), fx.root.join("ns1/claim-a"));
    }

    #[tokio::test]
    async fn test_recover_path_uses_recorded_host_dir() {
        let fx = fixture();
        let pv: PersistentVolume = serde_json::from_value(json!({
            "metadata": {
                "name": "pvc-7",
                "annotations": { "provisioner/hostDir": "/old/root" }
            },
            "spec": { "hostPath": { "path": "\\old\\root\\ns2-db" } }
        }))
        .unwrap();

        let (relative, host_dir) = fx.provisioner.recover_path(&pv).unwrap();
        assert_eq!(host_dir, PathBuf::from("/old/root"));
        assert_eq!(relative.under(&fx.root), fx.root.join("ns2-db"));
    }
}
