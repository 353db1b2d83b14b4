//! Metrics collection and exposition.
//!
//! # Metrics
//! - `catcher_requests_total` (counter): ingestion events by method
//! - `catcher_records_total` (counter): records by kind (`text|image|binary|form`)
//! - `catcher_store_writes_total` (counter): content store outcome (`written|deduplicated`)
//! - `catcher_unit_errors_total` (counter): units recorded with an error marker
//! - `catcher_repository_errors_total` (counter): failed appends
//! - `catcher_ingest_duration_seconds` (histogram): time to ingest one request
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::capture::record::PayloadKind;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_capture(method: &str) {
    counter!("catcher_requests_total", "method" => method.to_string()).increment(1);
}

pub fn record_log_record(kind: Option<PayloadKind>) {
    let kind = kind.map(|k| k.as_str()).unwrap_or("form");
    counter!("catcher_records_total", "kind" => kind).increment(1);
}

pub fn record_store_write(newly_written: bool) {
    let outcome = if newly_written { "written" } else { "deduplicated" };
    counter!("catcher_store_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_unit_errors(count: usize) {
    if count > 0 {
        counter!("catcher_unit_errors_total").increment(count as u64);
    }
}

pub fn record_repository_error() {
    counter!("catcher_repository_errors_total").increment(1);
}

pub fn record_ingest_duration(started: Instant) {
    histogram!("catcher_ingest_duration_seconds").record(started.elapsed().as_secs_f64());
}
