use axum::response::IntoResponse;
use axum::Extension;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs the process-wide Prometheus recorder. The returned handle is
/// kept alive for the process lifetime and rendered by [`metrics_handler`]
/// via an `Extension` layer, independent of the main `AppState`.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub async fn metrics_handler(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
