use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub dispatches_total: IntCounterVec,
    pub settlements_total: IntCounterVec,
    pub settlement_latency_seconds: HistogramVec,
    pub commission_collected_total: IntCounter,
    pub drivers_online: IntGauge,
    pub ws_connections: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let dispatches_total = IntCounterVec::new(
            Opts::new("dispatches_total", "Total driver searches by outcome"),
            &["outcome"],
        )
        .expect("valid dispatches_total metric");

        let settlements_total = IntCounterVec::new(
            Opts::new("settlements_total", "Total trip settlements by outcome"),
            &["outcome"],
        )
        .expect("valid settlements_total metric");

        let settlement_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "settlement_latency_seconds",
                "Latency of trip settlement in seconds",
            ),
            &["outcome"],
        )
        .expect("valid settlement_latency_seconds metric");

        let commission_collected_total = IntCounter::new(
            "commission_collected_total",
            "Sum of commission fees collected from drivers",
        )
        .expect("valid commission_collected_total metric");

        let drivers_online = IntGauge::new(
            "drivers_online",
            "Drivers currently reporting location over websocket",
        )
        .expect("valid drivers_online metric");

        let ws_connections = IntGauge::new(
            "ws_connections",
            "Currently open websocket connections",
        )
        .expect("valid ws_connections metric");

        registry
            .register(Box::new(dispatches_total.clone()))
            .expect("register dispatches_total");
        registry
            .register(Box::new(settlements_total.clone()))
            .expect("register settlements_total");
        registry
            .register(Box::new(settlement_latency_seconds.clone()))
            .expect("register settlement_latency_seconds");
        registry
            .register(Box::new(commission_collected_total.clone()))
            .expect("register commission_collected_total");
        registry
            .register(Box::new(drivers_online.clone()))
            .expect("register drivers_online");
        registry
            .register(Box::new(ws_connections.clone()))
            .expect("register ws_connections");

        Self {
            registry,
            dispatches_total,
            settlements_total,
            settlement_latency_seconds,
            commission_collected_total,
            drivers_online,
            ws_connections,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
