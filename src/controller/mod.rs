//! Controller Runtime Adapter
//!
//! Plugs the lifecycle engine into `kube::runtime` controllers:
//! - `claims`: provisions volumes for pending claims of our storage classes
//! - `volumes`: reclaims released volumes this provisioner created
//!
//! Watching, queueing and retry timing belong to `kube::runtime`; this module
//! only decides which objects to hand to the engine and publishes the result.

pub mod claims;
pub mod volumes;

use crate::domain::ports::{ProvisionerRef, StorageClassLookupRef};
use crate::error::{Error, ErrorAction};
use crate::metrics::ProvisionerMetrics;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Annotation naming the provisioner that created a volume
pub const PROVISIONED_BY_ANNOTATION: &str = "pv.kubernetes.io/provisioned-by";

/// Delay used for errors that ask for backoff
const BACKOFF_REQUEUE: Duration = Duration::from_secs(15);

// =============================================================================
// Controller Configuration
// =============================================================================

/// Runtime settings for the controllers
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Whether the deployment expects leader election in front of the controllers
    pub leader_election: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            leader_election: true,
        }
    }
}

// =============================================================================
// Context
// =============================================================================

/// Shared state handed to every reconcile call
pub struct Context {
    pub client: Client,
    pub provisioner: ProvisionerRef,
    pub classes: StorageClassLookupRef,
    pub metrics: ProvisionerMetrics,
    pub config: ControllerConfig,
}

impl Context {
    pub fn new(
        client: Client,
        provisioner: ProvisionerRef,
        classes: StorageClassLookupRef,
        metrics: ProvisionerMetrics,
        config: ControllerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            provisioner,
            classes,
            metrics,
            config,
        })
    }
}

/// Map an error's retry classification onto a controller action
pub fn requeue_action(error: &Error) -> Action {
    match error.action() {
        ErrorAction::RequeueWithBackoff => Action::requeue(BACKOFF_REQUEUE),
        ErrorAction::RequeueAfter(delay) => Action::requeue(delay),
        ErrorAction::NoRequeue => Action::await_change(),
    }
}

/// Run the claim and volume controllers until a shutdown signal arrives
pub async fn run(ctx: Arc<Context>) {
    info!(
        provisioner = ctx.provisioner.provisioner_name(),
        leader_election = ctx.config.leader_election,
        "Starting provisioner controllers"
    );
    if ctx.config.leader_election {
        info!("Leader election is delegated to the deployment; run a single active replica");
    }

    let claim_api: Api<PersistentVolumeClaim> = Api::all(ctx.client.clone());
    let volume_api: Api<PersistentVolume> = Api::all(ctx.client.clone());

    let claim_controller = Controller::new(claim_api, watcher::Config::default())
        .shutdown_on_signal()
        .run(claims::reconcile, claims::error_policy, ctx.clone())
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(claim = %object, "Reconciled claim"),
                Err(e) => warn!(error = %e, "Claim reconciliation failed"),
            }
        });

    let volume_controller = Controller::new(volume_api, watcher::Config::default())
        .shutdown_on_signal()
        .run(volumes::reconcile, volumes::error_policy, ctx.clone())
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(volume = %object, "Reconciled volume"),
                Err(e) => warn!(error = %e, "Volume reconciliation failed"),
            }
        });

    futures::join!(claim_controller, volume_controller);
    info!("Provisioner controllers stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requeue_action() {
        let err = Error::EmptyPath {
            template: "".into(),
        };
        assert_eq!(requeue_action(&err), Action::await_change());

        let err = Error::StorageClassLookup {
            object: "pvc-1".into(),
            reason: "volume has no storage class".into(),
        };
        assert_eq!(requeue_action(&err), Action::requeue(Duration::from_secs(30)));

        let err = Error::Internal("boom".into());
        assert_eq!(requeue_action(&err), Action::requeue(BACKOFF_REQUEUE));
    }
}
