//! Metric definitions for the AM43 blind controller.
//!
//! Every metric the control layer records is declared here as a [`Metric`]
//! constant, so names and units live in one place. The `metrics` crate is
//! re-exported; without an installed recorder all recording calls are no-ops.
//!
//! # Example
//!
//! ```rust
//! use am43_metrics::{metric_defs, DeviceLabels};
//!
//! let labels = DeviceLabels::new("living_room", "02:4E:F0:E3:8A:2B");
//! metrics::counter!(metric_defs::FRAMES_TX.name, &labels.to_labels()[..]).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use am43_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const WRITES: Metric = Metric::counter("am43.example.writes")
///     .with_description("Example writes")
///     .with_unit(Unit::Count)
///     .with_labels(&["device"]);
///
/// assert_eq!(WRITES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "am43.frames.tx").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Creates a histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }

    /// Returns the unit as a human-readable string.
    pub fn unit_str(&self) -> &'static str {
        match self.unit {
            Some(Unit::Count) => "count",
            Some(Unit::Percent) => "percent",
            Some(Unit::Seconds) => "seconds",
            Some(Unit::Milliseconds) => "milliseconds",
            Some(Unit::Microseconds) => "microseconds",
            Some(Unit::Bytes) => "bytes",
            Some(_) => "other",
            None => "",
        }
    }

    /// One-line listing: name, kind, unit and description.
    pub fn summary(&self) -> String {
        let unit = match self.unit_str() {
            "" => "-",
            unit => unit,
        };
        format!("{:32} {:9} {:12} {}", self.name, self.kind, unit, self.description)
    }
}

/// All metric definitions.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on every device-scoped metric.
    pub const DEVICE_LABELS: &[&str] = &["device", "address"];

    // ========================================================================
    // Frames
    // ========================================================================

    /// Command frames written to a link.
    ///
    /// Labels: device, address, command
    pub const FRAMES_TX: Metric = Metric::counter("am43.frames.tx")
        .with_description("Command frames written to actuators")
        .with_unit(Unit::Count)
        .with_labels(&["device", "address", "command"]);

    /// Notifications decoded from a link.
    ///
    /// Labels: device, address, kind
    pub const FRAMES_RX: Metric = Metric::counter("am43.frames.rx")
        .with_description("Notifications decoded from actuators")
        .with_unit(Unit::Count)
        .with_labels(&["device", "address", "kind"]);

    /// Notifications dropped because they failed to decode.
    pub const FRAMES_DECODE_ERRORS: Metric = Metric::counter("am43.frames.decode_errors")
        .with_description("Notifications dropped as malformed")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    // ========================================================================
    // Connections
    // ========================================================================

    /// Connection attempts, successful or not.
    pub const CONNECT_ATTEMPTS: Metric = Metric::counter("am43.connect.attempts")
        .with_description("Connection attempts")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    /// Devices given up on after the last attempt.
    pub const CONNECT_FAILURES: Metric = Metric::counter("am43.connect.failures")
        .with_description("Devices that stayed unreachable after every attempt")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Commands that got no decodable reply in time.
    pub const SESSION_TIMEOUTS: Metric = Metric::counter("am43.session.timeouts")
        .with_description("Commands without a reply inside the response timeout")
        .with_unit(Unit::Count)
        .with_labels(DEVICE_LABELS);

    /// Sessions that ended Faulted.
    ///
    /// Labels: device, address, reason
    pub const SESSION_FAULTS: Metric = Metric::counter("am43.session.faults")
        .with_description("Sessions that ended in the faulted state")
        .with_unit(Unit::Count)
        .with_labels(&["device", "address", "reason"]);

    /// Time from write to the first decodable reply.
    pub const SESSION_RESPONSE_TIME: Metric = Metric::histogram("am43.session.response_time_ms")
        .with_description("Time from command write to decoded reply")
        .with_unit(Unit::Milliseconds)
        .with_labels(DEVICE_LABELS);

    /// Last battery reading.
    pub const DEVICE_BATTERY: Metric = Metric::gauge("am43.device.battery")
        .with_description("Last reported battery charge")
        .with_unit(Unit::Percent)
        .with_labels(DEVICE_LABELS);

    // ========================================================================
    // Fleet
    // ========================================================================

    /// Fleet actions performed.
    ///
    /// Labels: action, result
    pub const FLEET_ACTIONS: Metric = Metric::counter("am43.fleet.actions")
        .with_description("Fleet actions performed")
        .with_unit(Unit::Count)
        .with_labels(&["action", "result"]);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &FRAMES_TX,
        &FRAMES_RX,
        &FRAMES_DECODE_ERRORS,
        &CONNECT_ATTEMPTS,
        &CONNECT_FAILURES,
        &SESSION_TIMEOUTS,
        &SESSION_FAULTS,
        &SESSION_RESPONSE_TIME,
        &DEVICE_BATTERY,
        &FLEET_ACTIONS,
    ];
}

/// Labels identifying one configured actuator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLabels {
    /// Configured device name.
    pub device: String,
    /// Wireless address.
    pub address: String,
}

impl DeviceLabels {
    /// Creates labels for the given device.
    pub fn new(device: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            address: address.into(),
        }
    }

    /// Converts the labels to the metrics crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("device", self.device.clone()),
            ("address", self.address.clone()),
        ]
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all metrics.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Installs a Prometheus recorder serving `/metrics` on `addr`, then
/// describes all metrics.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}
