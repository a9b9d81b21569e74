//! Claim Reconciler
//!
//! Provisions a volume for every pending claim whose storage class names
//! this provisioner, then publishes it bound to the claim.

use super::{requeue_action, Context, PROVISIONED_BY_ANNOTATION};
use crate::cluster::class_name_for_claim;
use crate::domain::ports::ProvisionOptions;
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::{ObjectReference, PersistentVolume, PersistentVolumeClaim};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::PostParams;
use kube::runtime::controller::Action;
use kube::Api;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay before checking again for a storage class that does not exist yet
pub const MISSING_CLASS_REQUEUE: Duration = Duration::from_secs(30);

/// Volume name the runtime assigns to a claim
pub fn volume_name_for(claim: &PersistentVolumeClaim) -> Option<String> {
    claim
        .metadata
        .uid
        .as_deref()
        .filter(|uid| !uid.is_empty())
        .map(|uid| format!("pvc-{}", uid))
}

/// Whether a claim still waits for a volume
pub fn needs_volume(claim: &PersistentVolumeClaim) -> bool {
    if claim.metadata.deletion_timestamp.is_some() {
        return false;
    }

    let bound_volume = claim
        .spec
        .as_ref()
        .and_then(|spec| spec.volume_name.as_deref())
        .is_some_and(|name| !name.is_empty());
    let phase = claim
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref());

    !bound_volume && matches!(phase, None | Some("Pending"))
}

/// The claim's storage class if this provisioner serves it, otherwise the
/// action to finish the reconcile with.
///
/// Creating a class does not produce a claim event, so a missing class is
/// polled for.
pub fn select_class(
    class_name: &str,
    class: Option<StorageClass>,
    provisioner_name: &str,
) -> std::result::Result<StorageClass, Action> {
    match class {
        Some(class) if class.provisioner == provisioner_name => Ok(class),
        Some(_) => Err(Action::await_change()),
        None => {
            debug!(class = class_name, "Storage class not found, checking again later");
            Err(Action::requeue(MISSING_CLASS_REQUEUE))
        }
    }
}

/// Add the fields that bind a provisioned volume to its claim
pub fn finalize_volume(
    mut volume: PersistentVolume,
    claim: &PersistentVolumeClaim,
    class_name: &str,
    provisioner_name: &str,
) -> PersistentVolume {
    volume
        .metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert(
            PROVISIONED_BY_ANNOTATION.to_string(),
            provisioner_name.to_string(),
        );

    let spec = volume.spec.get_or_insert_with(Default::default);
    spec.storage_class_name = Some(class_name.to_string());
    spec.volume_mode = claim.spec.as_ref().and_then(|s| s.volume_mode.clone());
    spec.claim_ref = Some(ObjectReference {
        api_version: Some("v1".to_string()),
        kind: Some("PersistentVolumeClaim".to_string()),
        namespace: claim.metadata.namespace.clone(),
        name: claim.metadata.name.clone(),
        uid: claim.metadata.uid.clone(),
        resource_version: claim.metadata.resource_version.clone(),
        ..Default::default()
    });

    volume
}

/// Reconcile one claim
pub async fn reconcile(claim: Arc<PersistentVolumeClaim>, ctx: Arc<Context>) -> Result<Action> {
    if !needs_volume(&claim) {
        return Ok(Action::await_change());
    }
    let Some(class_name) = class_name_for_claim(&claim) else {
        return Ok(Action::await_change());
    };
    let class = ctx.classes.get(class_name).await?;
    let class = match select_class(class_name, class, ctx.provisioner.provisioner_name()) {
        Ok(class) => class,
        Err(action) => return Ok(action),
    };

    let volume_name = volume_name_for(&claim)
        .ok_or_else(|| Error::InvalidRequest("claim has no uid".into()))?;

    let volumes: Api<PersistentVolume> = Api::all(ctx.client.clone());
    if volumes.get_opt(&volume_name).await?.is_some() {
        debug!(volume = %volume_name, "Volume already exists");
        return Ok(Action::await_change());
    }

    let class_name = class_name.to_string();
    let options = ProvisionOptions::new((*claim).clone(), class, volume_name);
    let claim_key = options.claim_key();

    let outcome = match ctx.provisioner.provision(&options).await {
        Ok(outcome) => {
            ctx.metrics.record_provision(true);
            outcome
        }
        Err(e) => {
            ctx.metrics.record_provision(false);
            warn!(
                claim = %claim_key,
                state = %e.provisioning_state(),
                error = %e,
                "Failed to provision volume"
            );
            return Err(e);
        }
    };

    let volume = finalize_volume(
        outcome.volume,
        &claim,
        &class_name,
        ctx.provisioner.provisioner_name(),
    );
    volumes.create(&PostParams::default(), &volume).await?;

    info!(claim = %claim_key, volume = %options.volume_name, "Published volume");
    Ok(Action::await_change())
}

pub fn error_policy(_claim: Arc<PersistentVolumeClaim>, error: &Error, _ctx: Arc<Context>) -> Action {
    requeue_action(error)
}
