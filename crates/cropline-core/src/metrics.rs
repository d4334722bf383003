//! Observability sink for the processing pipeline.
//!
//! The pipeline never talks to a global registry. It is handed an
//! `Arc<dyn Metrics>` at construction; "metrics disabled" is simply
//! [`NoopMetrics`]. Recording never blocks on I/O and never fails a request.
//!
//! [`InMemoryMetrics`] keeps the standard series in memory and renders them
//! in the Prometheus text exposition format:
//!
//! | Series | Kind | Labels |
//! |---|---|---|
//! | `requests_total` | counter | |
//! | `errors_total` | counter | `type` |
//! | `request_duration_seconds` | histogram | |
//! | `request_span_duration_seconds` | histogram | `span` |
//! | `download_duration_seconds` | histogram | |
//! | `processing_duration_seconds` | histogram | |
//! | `buffer_size_bytes` | histogram | `type` |
//! | `buffer_default_size_bytes` | gauge | `type` |
//! | `buffer_max_size_bytes` | gauge | `type` |

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Deserialize;

/// Request segments timed separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Queue,
    Downloading,
    Processing,
}

impl Segment {
    /// Value of the `span` label.
    pub fn as_label(&self) -> &'static str {
        match self {
            Segment::Queue => "queue",
            Segment::Downloading => "downloading",
            Segment::Processing => "processing",
        }
    }
}

/// Counters, histograms and gauges the pipeline reports to.
pub trait Metrics: Send + Sync {
    fn increment_requests_total(&self);

    fn increment_errors_total(&self, kind: &str);

    fn observe_request_duration(&self, seconds: f64);

    fn observe_segment_duration(&self, segment: Segment, seconds: f64);

    fn observe_buffer_size(&self, kind: &str, bytes: usize);

    fn set_buffer_default_size(&self, kind: &str, bytes: usize);

    fn set_buffer_max_size(&self, kind: &str, bytes: usize);
}

impl dyn Metrics {
    /// Count a request and time it until the returned guard is dropped.
    pub fn start_request(&self) -> Timer<'_> {
        self.increment_requests_total();
        Timer::new(self, None)
    }

    /// Time a segment until the returned guard is dropped.
    pub fn start_segment(&self, segment: Segment) -> Timer<'_> {
        Timer::new(self, Some(segment))
    }
}

/// Observes the elapsed time when dropped.
#[must_use = "the duration is observed when the timer is dropped"]
pub struct Timer<'a> {
    metrics: &'a dyn Metrics,
    segment: Option<Segment>,
    started: Instant,
}

impl<'a> Timer<'a> {
    fn new(metrics: &'a dyn Metrics, segment: Option<Segment>) -> Self {
        Self {
            metrics,
            segment,
            started: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        let seconds = self.started.elapsed().as_secs_f64();
        match self.segment {
            Some(segment) => self.metrics.observe_segment_duration(segment, seconds),
            None => self.metrics.observe_request_duration(seconds),
        }
    }
}

/// Metrics sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn increment_requests_total(&self) {}

    fn increment_errors_total(&self, _kind: &str) {}

    fn observe_request_duration(&self, _seconds: f64) {}

    fn observe_segment_duration(&self, _segment: Segment, _seconds: f64) {}

    fn observe_buffer_size(&self, _kind: &str, _bytes: usize) {}

    fn set_buffer_default_size(&self, _kind: &str, _bytes: usize) {}

    fn set_buffer_max_size(&self, _kind: &str, _bytes: usize) {}
}

/// Default Prometheus histogram buckets, in seconds.
const DURATION_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Cumulative histogram with fixed upper bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    bounds: Vec<f64>,
    counts: Vec<u64>,
    sum: f64,
    count: u64,
}

impl Histogram {
    fn new(bounds: Vec<f64>) -> Self {
        let counts = vec![0; bounds.len()];
        Self {
            bounds,
            counts,
            sum: 0.0,
            count: 0,
        }
    }

    fn durations() -> Self {
        Self::new(DURATION_BUCKETS.to_vec())
    }

    /// 1 KiB doubling 14 times.
    fn buffer_sizes() -> Self {
        Self::new((0..14).map(|i| 1024.0 * 2f64.powi(i)).collect())
    }

    fn observe(&mut self, value: f64) {
        for (bound, count) in self.bounds.iter().zip(self.counts.iter_mut()) {
            if value <= *bound {
                *count += 1;
            }
        }
        self.sum += value;
        self.count += 1;
    }

    /// Number of observations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all observed values.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// `(upper bound, cumulative count)` pairs, without `+Inf`.
    pub fn buckets(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.bounds.iter().copied().zip(self.counts.iter().copied())
    }
}

#[derive(Debug, Default)]
struct Registry {
    requests_total: u64,
    errors_total: BTreeMap<String, u64>,
    request_duration: Option<Histogram>,
    span_duration: BTreeMap<Segment, Histogram>,
    download_duration: Option<Histogram>,
    processing_duration: Option<Histogram>,
    buffer_size: BTreeMap<String, Histogram>,
    buffer_default_size: BTreeMap<String, f64>,
    buffer_max_size: BTreeMap<String, f64>,
}

/// Metrics kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    namespace: String,
    registry: Mutex<Registry>,
}

impl InMemoryMetrics {
    /// Create a sink whose rendered series are prefixed by `namespace_`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Run `f` on the registry. A poisoned lock skips the observation.
    fn record(&self, f: impl FnOnce(&mut Registry)) {
        if let Ok(mut registry) = self.registry.lock() {
            f(&mut registry);
        }
    }

    fn read<T: Default>(&self, f: impl FnOnce(&Registry) -> T) -> T {
        self.registry.lock().map(|r| f(&*r)).unwrap_or_default()
    }

    pub fn requests_total(&self) -> u64 {
        self.read(|r| r.requests_total)
    }

    pub fn errors_total(&self, kind: &str) -> u64 {
        self.read(|r| r.errors_total.get(kind).copied().unwrap_or(0))
    }

    pub fn segment_duration(&self, segment: Segment) -> Option<Histogram> {
        self.read(|r| r.span_duration.get(&segment).cloned())
    }

    pub fn request_duration(&self) -> Option<Histogram> {
        self.read(|r| r.request_duration.clone())
    }

    pub fn processing_duration(&self) -> Option<Histogram> {
        self.read(|r| r.processing_duration.clone())
    }

    pub fn buffer_size(&self, kind: &str) -> Option<Histogram> {
        self.read(|r| r.buffer_size.get(kind).cloned())
    }

    pub fn buffer_default_size(&self, kind: &str) -> Option<f64> {
        self.read(|r| r.buffer_default_size.get(kind).copied())
    }

    pub fn buffer_max_size(&self, kind: &str) -> Option<f64> {
        self.read(|r| r.buffer_max_size.get(kind).copied())
    }

    fn name(&self, name: &str) -> String {
        if self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", self.namespace, name)
        }
    }

    /// Render every series in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let Ok(r) = self.registry.lock() else {
            return String::new();
        };
        let mut out = String::new();

        let name = self.name("requests_total");
        header(
            &mut out,
            &name,
            "A counter of the total number of HTTP requests processed.",
            "counter",
        );
        let _ = writeln!(out, "{} {}", name, r.requests_total);

        let name = self.name("errors_total");
        header(&mut out, &name, "A counter of the occurred errors separated by type.", "counter");
        for (kind, value) in &r.errors_total {
            let _ = writeln!(out, "{}{{type=\"{}\"}} {}", name, kind, value);
        }

        let name = self.name("request_duration_seconds");
        header(&mut out, &name, "A histogram of the response latency.", "histogram");
        if let Some(h) = &r.request_duration {
            write_histogram(&mut out, &name, None, h);
        }

        let name = self.name("request_span_duration_seconds");
        header(&mut out, &name, "A histogram of the request segment latency.", "histogram");
        for (segment, h) in &r.span_duration {
            write_histogram(&mut out, &name, Some(("span", segment.as_label())), h);
        }

        let name = self.name("download_duration_seconds");
        header(
            &mut out,
            &name,
            "A histogram of the source image downloading latency.",
            "histogram",
        );
        if let Some(h) = &r.download_duration {
            write_histogram(&mut out, &name, None, h);
        }

        let name = self.name("processing_duration_seconds");
        header(&mut out, &name, "A histogram of the image processing latency.", "histogram");
        if let Some(h) = &r.processing_duration {
            write_histogram(&mut out, &name, None, h);
        }

        let name = self.name("buffer_size_bytes");
        header(&mut out, &name, "A histogram of the buffer size in bytes.", "histogram");
        for (kind, h) in &r.buffer_size {
            write_histogram(&mut out, &name, Some(("type", kind.as_str())), h);
        }

        let name = self.name("buffer_default_size_bytes");
        header(&mut out, &name, "A gauge of the buffer default size in bytes.", "gauge");
        for (kind, value) in &r.buffer_default_size {
            let _ = writeln!(out, "{}{{type=\"{}\"}} {}", name, kind, value);
        }

        let name = self.name("buffer_max_size_bytes");
        header(&mut out, &name, "A gauge of the buffer max size in bytes.", "gauge");
        for (kind, value) in &r.buffer_max_size {
            let _ = writeln!(out, "{}{{type=\"{}\"}} {}", name, kind, value);
        }

        out
    }
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

fn write_histogram(out: &mut String, name: &str, label: Option<(&str, &str)>, h: &Histogram) {
    let prefix = label
        .map(|(k, v)| format!("{}=\"{}\",", k, v))
        .unwrap_or_default();
    let plain = label
        .map(|(k, v)| format!("{{{}=\"{}\"}}", k, v))
        .unwrap_or_default();

    for (bound, count) in h.buckets() {
        let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, bound, count);
    }
    let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, h.count);
    let _ = writeln!(out, "{}_sum{} {}", name, plain, h.sum);
    let _ = writeln!(out, "{}_count{} {}", name, plain, h.count);
}

impl Metrics for InMemoryMetrics {
    fn increment_requests_total(&self) {
        self.record(|r| r.requests_total += 1);
    }

    fn increment_errors_total(&self, kind: &str) {
        self.record(|r| *r.errors_total.entry(kind.to_string()).or_default() += 1);
    }

    fn observe_request_duration(&self, seconds: f64) {
        self.record(|r| {
            r.request_duration
                .get_or_insert_with(Histogram::durations)
                .observe(seconds)
        });
    }

    fn observe_segment_duration(&self, segment: Segment, seconds: f64) {
        self.record(|r| {
            r.span_duration
                .entry(segment)
                .or_insert_with(Histogram::durations)
                .observe(seconds);

            // Segment-specific series kept alongside the labelled one
            let legacy = match segment {
                Segment::Downloading => Some(&mut r.download_duration),
                Segment::Processing => Some(&mut r.processing_duration),
                Segment::Queue => None,
            };
            if let Some(h) = legacy {
                h.get_or_insert_with(Histogram::durations).observe(seconds);
            }
        });
    }

    fn observe_buffer_size(&self, kind: &str, bytes: usize) {
        self.record(|r| {
            r.buffer_size
                .entry(kind.to_string())
                .or_insert_with(Histogram::buffer_sizes)
                .observe(bytes as f64)
        });
    }

    fn set_buffer_default_size(&self, kind: &str, bytes: usize) {
        self.record(|r| {
            r.buffer_default_size.insert(kind.to_string(), bytes as f64);
        });
    }

    fn set_buffer_max_size(&self, kind: &str, bytes: usize) {
        self.record(|r| {
            r.buffer_max_size.insert(kind.to_string(), bytes as f64);
        });
    }
}

/// Metrics section of the engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Collect metrics in memory. When off, every observation is dropped.
    pub enabled: bool,
    /// Prefix of every rendered series name.
    pub namespace: String,
}

impl MetricsConfig {
    /// Build the sink described by this config.
    pub fn build(&self) -> Arc<dyn Metrics> {
        if self.enabled {
            Arc::new(InMemoryMetrics::new(self.namespace.clone()))
        } else {
            Arc::new(NoopMetrics)
        }
    }
}
