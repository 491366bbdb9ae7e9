use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

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

pub(crate) fn record_quiz_submission(outcome: &'static str) {
    metrics::counter!("quiz_submissions_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_grading_action(action: &'static str) {
    metrics::counter!("grading_actions_total", "action" => action).increment(1);
}

pub(crate) fn record_message(direction: &'static str, accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    metrics::counter!("messages_sent_total", "direction" => direction, "outcome" => outcome)
        .increment(1);
}
