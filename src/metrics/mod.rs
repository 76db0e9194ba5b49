/*!
 * # Metrics
 *
 * Process-wide Prometheus counters, exposed in text format at `/metrics`.
 */

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Workflow transitions by entity, action and outcome (`ok` / `rejected`).
    pub static ref WORKFLOW_TRANSITIONS: IntCounterVec = register_counter_vec(
        "millwork_workflow_transitions_total",
        "Drawing and material workflow transitions",
        &["entity", "action", "outcome"],
    );

    pub static ref IMPORT_ROWS: IntCounterVec = register_counter_vec(
        "millwork_import_rows_total",
        "Spreadsheet rows processed by import, by outcome",
        &["outcome"],
    );

    pub static ref CACHE_LOOKUPS: IntCounterVec = register_counter_vec(
        "millwork_cache_lookups_total",
        "In-memory cache lookups by cache name and result",
        &["cache", "result"],
    );

    pub static ref DASHBOARD_SECTION_FAILURES: IntCounterVec = register_counter_vec(
        "millwork_dashboard_section_failures_total",
        "Dashboard sections that fell back to empty values",
        &["section"],
    );

    pub static ref NOTIFICATIONS_SENT: IntCounterVec = register_counter_vec(
        "millwork_notifications_total",
        "Outbound notifications by channel and outcome",
        &["channel", "outcome"],
    );

    pub static ref DB_CONNECTION_FAILURES: IntCounter = register_counter(
        "millwork_db_connection_failures_total",
        "Failed attempts to connect to or ping the database",
    );
}

fn register_counter_vec(name: &str, help: &str, labels: &[&str]) -> IntCounterVec {
    let counter = IntCounterVec::new(Opts::new(name, help), labels).expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
}

fn register_counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).expect("metric can be created");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric can be registered");
    counter
}

/// Records a workflow transition attempt.
pub fn record_transition(entity: &str, action: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "rejected" };
    WORKFLOW_TRANSITIONS
        .with_label_values(&[entity, action, outcome])
        .inc();
}

/// Renders every registered metric in Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

pub async fn metrics_handler() -> Response {
    match render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_show_up_in_text_output() {
        record_transition("drawing", "send_to_client", true);
        DB_CONNECTION_FAILURES.inc();
        let text = render().unwrap();
        assert!(text.contains("millwork_workflow_transitions_total"));
        assert!(text.contains("millwork_db_connection_failures_total"));
    }
}
