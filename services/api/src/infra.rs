use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use roomlet::config::GatewaySettings;
use roomlet::workflows::rental::gateway::GatewayConfig;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn gateway_config(settings: &GatewaySettings) -> GatewayConfig {
    GatewayConfig {
        endpoint: settings.endpoint.clone(),
        secret: settings.secret.clone(),
        return_url: settings.return_url.clone(),
        result_page: settings.result_page.clone(),
        locale: settings.locale.clone(),
    }
}
