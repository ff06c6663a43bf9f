use prometheus::{
    register_counter_with_registry, register_gauge_with_registry, register_histogram_with_registry,
    Counter, Gauge, Histogram, Registry,
};
use std::sync::Arc;

pub struct PollMetrics {
    pub active_polls: Gauge,
    pub polls_created: Counter,
    pub votes_recorded: Counter,
    pub results_served: Counter,
    pub error_counts: Counter,
    pub request_latency: Histogram,
    pub registry: Arc<Registry>,
}

impl PollMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Arc::new(Registry::new());

        let active_polls = register_gauge_with_registry!(
            "poll_server_active_polls",
            "Number of polls held in memory",
            registry
        )?;

        let polls_created = register_counter_with_registry!(
            "poll_server_polls_created_total",
            "Total number of polls created",
            registry
        )?;

        let votes_recorded = register_counter_with_registry!(
            "poll_server_votes_recorded_total",
            "Total number of votes recorded",
            registry
        )?;

        let results_served = register_counter_with_registry!(
            "poll_server_results_served_total",
            "Total number of poll results served",
            registry
        )?;

        let error_counts = register_counter_with_registry!(
            "poll_server_errors_total",
            "Total number of rejected requests",
            registry
        )?;

        let request_latency = register_histogram_with_registry!(
            "poll_server_request_latency_seconds",
            "Request latency in seconds",
            registry
        )?;

        Ok(Self {
            active_polls,
            polls_created,
            votes_recorded,
            results_served,
            error_counts,
            request_latency,
            registry,
        })
    }

    pub fn export_prometheus(&self) -> anyhow::Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_contains_counters() {
        let metrics = PollMetrics::new().unwrap();
        metrics.polls_created.inc();
        metrics.active_polls.set(1.0);

        let text = metrics.export_prometheus().unwrap();
        assert!(text.contains("poll_server_polls_created_total 1"));
        assert!(text.contains("poll_server_active_polls 1"));
    }
}
