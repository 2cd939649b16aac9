use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// GET /metrics: Prometheus text exposition of the analysis and catalog
/// counters.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for every metric the service emits.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "analysis_requests_total",
        "Image analysis requests, labelled by mode"
    );
    metrics::describe_counter!(
        "analysis_images_failed_total",
        "Images whose per-image analysis failed"
    );
    metrics::describe_counter!(
        "analysis_requests_failed_total",
        "Analysis requests that failed as a whole, labelled by mode"
    );
    metrics::describe_counter!("products_created_total", "Products persisted");
    metrics::describe_histogram!(
        "analysis_duration_seconds",
        "Wall-clock time of an analysis request, labelled by mode"
    );
}
