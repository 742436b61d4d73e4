//! # Prometheus Metrics
//!
//! Operational counters for a tip registry. All metrics are registered in a
//! dedicated [`prometheus::Registry`] (prefix `tipjar`) so they do not
//! collide with any default global registry consumers; the host scrapes
//! them with [`RegistryMetrics::encode`].

use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

/// Holds all Prometheus metric handles for one tip registry.
///
/// Clone-friendly: prometheus handles are `Arc`s internally.
#[derive(Clone)]
pub struct RegistryMetrics {
    registry: Registry,
    /// First-time handle registrations.
    pub registrations_total: IntCounter,
    /// Renames of an existing handle.
    pub renames_total: IntCounter,
    /// Controller re-points.
    pub controller_updates_total: IntCounter,
    /// Successful tips.
    pub tips_total: IntCounter,
    /// Fees delivered to the fee sink.
    pub fee_forwards_total: IntCounter,
    /// Fees the sink rejected and that were credited back to the handle.
    pub fee_refunds_total: IntCounter,
    /// Successful withdrawals.
    pub withdrawals_total: IntCounter,
    /// Outbound transfers the recipient rejected.
    pub transfer_failures_total: IntCounter,
    /// Guarded calls rejected because another one was running.
    pub reentrancy_rejections_total: IntCounter,
    /// Calls rejected because the registry was paused.
    pub paused_rejections_total: IntCounter,
}

impl RegistryMetrics {
    /// Creates and registers all metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("tipjar".into()), None)?;

        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::new(name, help)?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        let registrations_total =
            counter("registrations_total", "First-time handle registrations")?;
        let renames_total = counter("renames_total", "Handles moved to a new name")?;
        let controller_updates_total =
            counter("controller_updates_total", "Handles re-pointed to a new controller")?;
        let tips_total = counter("tips_total", "Successful tips")?;
        let fee_forwards_total =
            counter("fee_forwards_total", "Tip fees delivered to the fee sink")?;
        let fee_refunds_total = counter(
            "fee_refunds_total",
            "Tip fees rejected by the fee sink and credited to the handle",
        )?;
        let withdrawals_total = counter("withdrawals_total", "Successful withdrawals")?;
        let transfer_failures_total = counter(
            "transfer_failures_total",
            "Outbound value transfers rejected by the recipient",
        )?;
        let reentrancy_rejections_total = counter(
            "reentrancy_rejections_total",
            "Guarded calls rejected while another guarded call was running",
        )?;
        let paused_rejections_total = counter(
            "paused_rejections_total",
            "Calls rejected because the registry was paused",
        )?;

        Ok(Self {
            registry,
            registrations_total,
            renames_total,
            controller_updates_total,
            tips_total,
            fee_forwards_total,
            fee_refunds_total,
            withdrawals_total,
            transfer_failures_total,
            reentrancy_rejections_total,
            paused_rejections_total,
        })
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
