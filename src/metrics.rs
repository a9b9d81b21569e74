//! Provisioner Metrics
//!
//! Prometheus counters for provision and delete outcomes, exposed on the
//! metrics endpoint.

use crate::error::Result;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome counters registered on a dedicated registry
#[derive(Clone)]
pub struct ProvisionerMetrics {
    registry: Registry,
    provisions: IntCounterVec,
    deletes: IntCounterVec,
}

impl ProvisionerMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let provisions = IntCounterVec::new(
            Opts::new(
                "hostpath_provisioner_provisions_total",
                "Provision attempts by result",
            ),
            &["result"],
        )?;
        let deletes = IntCounterVec::new(
            Opts::new(
                "hostpath_provisioner_deletes_total",
                "Volume reclaim attempts by result",
            ),
            &["result"],
        )?;

        registry.register(Box::new(provisions.clone()))?;
        registry.register(Box::new(deletes.clone()))?;

        Ok(Self {
            registry,
            provisions,
            deletes,
        })
    }

    pub fn record_provision(&self, success: bool) {
        self.provisions
            .with_label_values(&[result_label(success)])
            .inc();
    }

    pub fn record_delete(&self, success: bool) {
        self.deletes.with_label_values(&[result_label(success)]).inc();
    }

    /// Render all metrics in the text exposition format
    pub fn encode(&self) -> Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

fn result_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}
