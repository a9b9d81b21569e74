//! Volume Reconciler
//!
//! Reclaims released volumes created by this provisioner and removes the
//! volume object once the backing directory has been dealt with. A failed
//! reclaim leaves the object in place for the next attempt.

use super::{requeue_action, Context, PROVISIONED_BY_ANNOTATION};
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::PersistentVolume;
use kube::api::DeleteParams;
use kube::runtime::controller::Action;
use kube::Api;
use std::sync::Arc;
use tracing::{info, warn};

/// Whether a volume is released, ours, and asks to be deleted
pub fn should_reclaim(volume: &PersistentVolume, provisioner_name: &str) -> bool {
    let released = volume
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        == Some("Released");
    let delete_policy = volume
        .spec
        .as_ref()
        .and_then(|spec| spec.persistent_volume_reclaim_policy.as_deref())
        == Some("Delete");
    let ours = volume
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(PROVISIONED_BY_ANNOTATION))
        .is_some_and(|name| name == provisioner_name);

    released && delete_policy && ours
}

/// Reconcile one volume
pub async fn reconcile(volume: Arc<PersistentVolume>, ctx: Arc<Context>) -> Result<Action> {
    if !should_reclaim(&volume, ctx.provisioner.provisioner_name()) {
        return Ok(Action::await_change());
    }
    let name = volume.metadata.name.clone().unwrap_or_default();

    if let Err(e) = ctx.provisioner.delete(&volume).await {
        ctx.metrics.record_delete(false);
        warn!(volume = %name, error = %e, "Failed to reclaim volume");
        return Err(e);
    }
    ctx.metrics.record_delete(true);

    let volumes: Api<PersistentVolume> = Api::all(ctx.client.clone());
    match volumes.delete(&name, &DeleteParams::default()).await {
        Ok(_) => info!(volume = %name, "Deleted volume"),
        Err(kube::Error::Api(response)) if response.code == 404 => {}
        Err(e) => return Err(e.into()),
    }

    Ok(Action::await_change())
}

pub fn error_policy(_volume: Arc<PersistentVolume>, error: &Error, _ctx: Arc<Context>) -> Action {
    requeue_action(error)
}
