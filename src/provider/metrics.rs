//! Provider metrics
//!
//! Prometheus counters shared by every provider in the process.

use crate::error::RpcStatus;
use prometheus::{register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGauge, IntGaugeVec};
use std::sync::OnceLock;

struct Metrics {
    requests: Option<IntCounterVec>,
    live_collectors: Option<IntGaugeVec>,
}

fn metrics() -> &'static Metrics {
    static METRICS: OnceLock<Metrics> = OnceLock::new();
    METRICS.get_or_init(|| Metrics {
        requests: register_int_counter_vec!(
            "collector_rpc_requests_total",
            "RPC requests handled, by rpc name and status",
            &["rpc", "status"]
        )
        .ok(),
        live_collectors: register_int_gauge_vec!(
            "collector_live_collectors",
            "Collectors currently registered, by provider",
            &["provider_id"]
        )
        .ok(),
    })
}

/// Count one handled request
pub fn record_request(rpc: &str, status: RpcStatus) {
    if let Some(requests) = &metrics().requests {
        requests.with_label_values(&[rpc, status.as_str()]).inc();
    }
}

/// Gauge holding the table size of a provider
pub fn live_collectors_gauge(provider_id: u16) -> Option<IntGauge> {
    metrics()
        .live_collectors
        .as_ref()
        .map(|gauge| gauge.with_label_values(&[&provider_id.to_string()]))
}

/// Render every registered metric in the text exposition format
pub fn gather_text() -> String {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&prometheus::gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_requests_are_exposed() {
        record_request("sum", RpcStatus::Success);
        if let Some(gauge) = live_collectors_gauge(7) {
            gauge.set(3);
        }
        let text = gather_text();
        assert!(text.contains("collector_rpc_requests_total"));
        assert!(text.contains("collector_live_collectors"));
    }
}
