use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder when enabled. Safe to call more than
/// once; only the first successful install is kept.
pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_upload(outcome: &'static str) {
    metrics::counter!("workbook_uploads_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_dataset_size(records: usize) {
    metrics::gauge!("dataset_records").set(records as f64);
}

pub(crate) fn record_lookup(result: &'static str) {
    metrics::counter!("student_lookups_total", "result" => result).increment(1);
}
