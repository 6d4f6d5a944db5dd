//! Metrics collection and export for Roomcast.
//!
//! Instrumentation goes through the `metrics` facade; a Prometheus
//! exporter serves the scrape endpoint on a separate port.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Exported metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "roomcast_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "roomcast_connections_active";
    pub const ROOMS_ACTIVE: &str = "roomcast_rooms_active";
    pub const FRAMES_TOTAL: &str = "roomcast_frames_total";
    pub const FRAMES_BYTES: &str = "roomcast_frames_bytes";
    pub const MESSAGES_RELAYED_TOTAL: &str = "roomcast_messages_relayed_total";
    pub const FRAME_SECONDS: &str = "roomcast_frame_seconds";
    pub const ERRORS_TOTAL: &str = "roomcast_errors_total";
}

/// Register descriptions for every exported metric.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "WebSocket connections accepted since startup"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Connections currently open"
    );
    metrics::describe_gauge!(names::ROOMS_ACTIVE, "Current number of active rooms");
    metrics::describe_counter!(names::FRAMES_TOTAL, "Total number of frames processed");
    metrics::describe_counter!(names::FRAMES_BYTES, "Total bytes of frames processed");
    metrics::describe_counter!(
        names::MESSAGES_RELAYED_TOTAL,
        "Total chat messages relayed to peers"
    );
    metrics::describe_histogram!(
        names::FRAME_SECONDS,
        "Inbound frame handling latency in seconds"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Errors by type");

    info!("Metrics descriptions registered");
}

/// Serve the Prometheus scrape endpoint on its own port.
///
/// # Errors
///
/// Returns an error if the exporter fails to bind or install.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Prometheus exporter listening on {}", addr);
    Ok(())
}

/// Count a newly accepted connection.
pub fn record_connection() {
    counter!(names::CONNECTIONS_TOTAL).increment(1);
    gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
}

/// Count a closed connection.
pub fn record_disconnection() {
    gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a frame crossing the transport.
pub fn record_frame(bytes: usize, direction: &str) {
    counter!(names::FRAMES_TOTAL, "direction" => direction.to_string()).increment(1);
    counter!(names::FRAMES_BYTES, "direction" => direction.to_string()).increment(bytes as u64);
}

/// Record a chat message relayed to a peer.
pub fn record_message_relayed() {
    counter!(names::MESSAGES_RELAYED_TOTAL).increment(1);
}

/// Record inbound frame handling latency.
pub fn record_frame_latency(seconds: f64) {
    histogram!(names::FRAME_SECONDS).record(seconds);
}

/// Update active room count.
pub fn set_active_rooms(count: usize) {
    gauge!(names::ROOMS_ACTIVE).set(count as f64);
}

/// Count an error, labeled by type.
pub fn record_error(error_type: &str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type.to_string()).increment(1);
}

/// Guard that counts the connection up front and the disconnection on drop.
pub struct ConnectionMetricsGuard;

impl ConnectionMetricsGuard {
    /// Count the connection and hand back the guard.
    #[must_use]
    pub fn new() -> Self {
        record_connection();
        Self
    }
}

impl Default for ConnectionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionMetricsGuard {
    fn drop(&mut self) {
        record_disconnection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_guard() {
        // Construction and drop must not panic
        let _guard = ConnectionMetricsGuard::new();
    }
}
