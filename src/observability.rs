//! Process-wide client metrics, rendered in Prometheus text format.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

const LATENCY_WINDOW: usize = 10_000;

pub struct Observability {
    requests_total: AtomicU64,
    request_errors_total: AtomicU64,
    no_response_requests_total: AtomicU64,
    bytes_sent_total: AtomicU64,
    bytes_received_total: AtomicU64,
    connections_opened_total: AtomicU64,
    connections_closed_total: AtomicU64,
    request_latency_us: Mutex<VecDeque<u64>>,
}

impl Observability {
    fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            request_errors_total: AtomicU64::new(0),
            no_response_requests_total: AtomicU64::new(0),
            bytes_sent_total: AtomicU64::new(0),
            bytes_received_total: AtomicU64::new(0),
            connections_opened_total: AtomicU64::new(0),
            connections_closed_total: AtomicU64::new(0),
            request_latency_us: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW)),
        }
    }

    pub fn record_open(&self) {
        self.connections_opened_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_close(&self) {
        self.connections_closed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, bytes: usize) {
        self.bytes_sent_total
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_received(&self, bytes: usize) {
        self.bytes_received_total
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// One finished round trip; `expected_response` is false for fire-and-forget.
    pub fn record_request(&self, latency: Duration, ok: bool, expected_response: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.request_errors_total.fetch_add(1, Ordering::Relaxed);
        }
        if !expected_response {
            self.no_response_requests_total
                .fetch_add(1, Ordering::Relaxed);
        }
        let us = latency.as_micros() as u64;
        let mut lock = self.request_latency_us.lock();
        if lock.len() >= LATENCY_WINDOW {
            lock.pop_front();
        }
        lock.push_back(us);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn request_errors_total(&self) -> u64 {
        self.request_errors_total.load(Ordering::Relaxed)
    }

    pub fn no_response_requests_total(&self) -> u64 {
        self.no_response_requests_total.load(Ordering::Relaxed)
    }

    fn p99_latency_us(&self) -> u64 {
        let lock = self.request_latency_us.lock();
        if lock.is_empty() {
            return 0;
        }
        let mut v: Vec<u64> = lock.iter().copied().collect();
        drop(lock);
        v.sort_unstable();
        let idx = ((v.len() as f64) * 0.99).floor() as usize;
        v[idx.min(v.len() - 1)]
    }

    pub fn render_prometheus(&self) -> String {
        let counters = [
            ("brokerlink_requests_total", &self.requests_total),
            ("brokerlink_request_errors_total", &self.request_errors_total),
            (
                "brokerlink_no_response_requests_total",
                &self.no_response_requests_total,
            ),
            ("brokerlink_bytes_sent_total", &self.bytes_sent_total),
            ("brokerlink_bytes_received_total", &self.bytes_received_total),
            (
                "brokerlink_connections_opened_total",
                &self.connections_opened_total,
            ),
            (
                "brokerlink_connections_closed_total",
                &self.connections_closed_total,
            ),
        ];
        let mut out = String::new();
        for (name, value) in counters {
            out.push_str(&format!("# TYPE {} counter\n", name));
            out.push_str(&format!("{} {}\n", name, value.load(Ordering::Relaxed)));
        }
        out.push_str("# TYPE brokerlink_request_latency_p99_us gauge\n");
        out.push_str(&format!(
            "brokerlink_request_latency_p99_us {}\n",
            self.p99_latency_us()
        ));
        out
    }
}

static OBS: OnceLock<Observability> = OnceLock::new();

pub fn observability() -> &'static Observability {
    OBS.get_or_init(Observability::new)
}
