use axum::http::StatusCode;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

/// Request instruments on the global meter provider. No-ops until a
/// provider is installed by `common::TelemetryGuard`.
#[derive(Clone)]
pub struct RequestMetrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
    detections: Counter<u64>,
}

impl RequestMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];

        Self {
            duration: meter
                .f64_histogram("detector_request_duration_seconds")
                .with_description("Time to serve a prediction request")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            requests: meter
                .u64_counter("detector_requests_total")
                .with_description("Total prediction requests by response status")
                .build(),
            detections: meter
                .u64_counter("detector_detections_total")
                .with_description("Total detections returned")
                .build(),
        }
    }

    pub fn record(&self, category: &str, status: StatusCode, elapsed: Duration, detections: usize) {
        let attributes = [
            KeyValue::new("category", category.to_string()),
            KeyValue::new("status", i64::from(status.as_u16())),
        ];
        self.duration.record(elapsed.as_secs_f64(), &attributes);
        self.requests.add(1, &attributes);
        if detections > 0 {
            self.detections
                .add(detections as u64, &[KeyValue::new("category", category.to_string())]);
        }
    }
}
