// metrics/mod.rs
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub const EVENTS_RECEIVED: &str = "music_events_received_total";
pub const EVENTS_MALFORMED: &str = "music_events_malformed_total";
pub const EVENTS_IGNORED: &str = "music_events_ignored_total";
pub const COMMANDS_SENT: &str = "music_commands_sent_total";
pub const CONNECTIONS_OPENED: &str = "music_connections_opened_total";

pub fn setup_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to setup metrics: {}", e))
}

pub fn event_received(action: &str) {
    ::metrics::counter!(EVENTS_RECEIVED, "action" => action.to_string()).increment(1);
}

pub fn event_malformed() {
    ::metrics::counter!(EVENTS_MALFORMED).increment(1);
}

pub fn event_ignored() {
    ::metrics::counter!(EVENTS_IGNORED).increment(1);
}

pub fn command_sent(action: &'static str) {
    ::metrics::counter!(COMMANDS_SENT, "action" => action).increment(1);
}

pub fn connection_opened() {
    ::metrics::counter!(CONNECTIONS_OPENED).increment(1);
}
