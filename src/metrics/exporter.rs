use std::io::Write;
use std::sync::Mutex;

use crate::metrics::snapshot::StatsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for stats snapshots.
///
/// Writes the text exposition format so a run's results can be scraped by
/// Prometheus or forwarded to an OpenTelemetry collector. Counters export as
/// `<prefix>_<name>_bytes_total` and `<prefix>_<name>_objects_total`; the
/// copy-forward histogram exports one labelled sample per non-empty bucket;
/// the latest segment exports as gauges.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send + Sync> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send + Sync> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lines(&self, lines: &[String]) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        for line in lines {
            let _ = writeln!(writer, "{}", line);
        }
    }

    fn counter(&self, name: &str, value: u64) -> [String; 2] {
        [
            format!("# TYPE {} counter", name),
            format!("{} {}", name, value),
        ]
    }

    fn gauge(&self, name: &str, value: f64) -> [String; 2] {
        [
            format!("# TYPE {} gauge", name),
            format!("{} {}", name, value),
        ]
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send + Sync> MetricsExporter<StatsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &StatsSnapshot) {
        let mut lines = Vec::new();

        for named in &snapshot.counters {
            lines.extend(self.counter(
                &self.metric_name(&format!("{}_bytes_total", named.name)),
                named.counter.byte_count,
            ));
            lines.extend(self.counter(
                &self.metric_name(&format!("{}_objects_total", named.name)),
                u64::from(named.counter.object_count),
            ));
        }

        lines.extend(self.counter(
            &self.metric_name("flash_bytes_written_total"),
            snapshot.flash_bytes_written,
        ));
        lines.extend(self.counter(
            &self.metric_name("containers_written_total"),
            snapshot.containers_written,
        ));
        lines.extend(self.counter(
            &self.metric_name("containers_erased_total"),
            snapshot.containers_erased,
        ));

        let hist = self.metric_name("copyfwd_hist");
        lines.push(format!("# TYPE {} counter", hist));
        for (count, objects) in snapshot.copyfwd_hist.iter_nonzero() {
            lines.push(format!("{}{{count=\"{}\"}} {}", hist, count, objects));
        }

        lines.extend(self.gauge(
            &self.metric_name("segment_period"),
            snapshot.segment_period as f64,
        ));
        lines.extend(self.gauge(
            &self.metric_name("average_occupancy"),
            snapshot.average_occupancy,
        ));
        lines.extend(self.gauge(
            &self.metric_name("byte_hit_ratio"),
            snapshot.overall_byte_hit_ratio,
        ));
        lines.extend(self.gauge(
            &self.metric_name("object_hit_ratio"),
            snapshot.overall_object_hit_ratio,
        ));
        lines.extend(self.gauge(
            &self.metric_name("write_amplification"),
            snapshot.overall_write_amplification,
        ));

        if let Some(last) = snapshot.segments.last() {
            lines.extend(self.gauge(
                &self.metric_name("segment_byte_hit_ratio"),
                last.byte_hit_ratio,
            ));
            lines.extend(self.gauge(
                &self.metric_name("segment_object_hit_ratio"),
                last.object_hit_ratio,
            ));
            lines.extend(self.gauge(
                &self.metric_name("segment_write_amplification"),
                last.write_amplification,
            ));
            lines.extend(self.gauge(
                &self.metric_name("segment_utilization"),
                last.utilization as f64,
            ));
        }

        self.write_lines(&lines);
    }
}

/// Pretty JSON exporter; one document per export.
#[derive(Debug)]
pub struct JsonExporter<W: Write + Send + Sync> {
    writer: Mutex<W>,
}

impl<W: Write + Send + Sync> JsonExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send + Sync> MetricsExporter<StatsSnapshot> for JsonExporter<W> {
    fn export(&self, snapshot: &StatsSnapshot) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        match snapshot.to_json() {
            Ok(json) => {
                let _ = writeln!(writer, "{}", json);
            },
            Err(err) => tracing::warn!(%err, "failed to serialize stats snapshot"),
        }
    }
}
