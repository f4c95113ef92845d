use std::io::{self, Write};

use serde_json::json;

use crate::runner::{CaseReport, Outcome};

/// A destination for finished case reports. The driver publishes every case
/// exactly once, in execution order.
pub trait ReportSink {
    fn publish(&mut self, report: &CaseReport) -> io::Result<()>;
}

/// Human-readable output, one block per case.
#[derive(Debug)]
pub struct TextSink<W> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        TextSink { out }
    }
}

impl<W: Write> ReportSink for TextSink<W> {
    fn publish(&mut self, report: &CaseReport) -> io::Result<()> {
        match &report.outcome {
            Outcome::Pass => {
                writeln!(
                    self.out,
                    "{}: pass  iterations={} items={} time={:.6}s",
                    report.name, report.iterations, report.items_processed, report.total_seconds
                )?;
                for (name, value) in report.metrics.iter() {
                    writeln!(self.out, "    {} = {}", name, value)?;
                }
            }
            Outcome::Skip(reason) => writeln!(self.out, "{}: skip ({})", report.name, reason)?,
            Outcome::Fail(message) => writeln!(self.out, "{}: FAIL ({})", report.name, message)?,
        }
        Ok(())
    }
}

/// Machine-readable output, one JSON object per line.
#[derive(Debug)]
pub struct JsonSink<W> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        JsonSink { out }
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn publish(&mut self, report: &CaseReport) -> io::Result<()> {
        let (status, detail) = match &report.outcome {
            Outcome::Pass => ("pass", None),
            Outcome::Skip(reason) => ("skip", Some(reason.as_str())),
            Outcome::Fail(message) => ("fail", Some(message.as_str())),
        };
        let line = json!({
            "name": report.name,
            "status": status,
            "detail": detail,
            "iterations": report.iterations,
            "items_processed": report.items_processed,
            "total_seconds": report.total_seconds,
            "metrics": report.metrics,
        });
        writeln!(self.out, "{}", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricSet;

    fn sample_report() -> CaseReport {
        let mut metrics = MetricSet::new();
        metrics.insert("input_size", 64.0);
        CaseReport {
            name: "cublas/gemm/f32".to_owned(),
            outcome: Outcome::Pass,
            iterations: 4,
            items_processed: 256,
            total_seconds: 0.5,
            metrics,
        }
    }

    #[test]
    fn text_sink_formats_pass() {
        let mut buffer = Vec::new();
        TextSink::new(&mut buffer).publish(&sample_report()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("cublas/gemm/f32: pass"));
        assert!(text.contains("input_size = 64"));
    }

    #[test]
    fn json_sink_emits_one_line() {
        let mut buffer = Vec::new();
        JsonSink::new(&mut buffer).publish(&sample_report()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 1);

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["status"], "pass");
        assert_eq!(value["metrics"]["input_size"], 64.0);
    }

    #[test]
    fn json_sink_reports_skip_reason() {
        let report = CaseReport {
            name: "cudnn/dropout_fwd/f32".to_owned(),
            outcome: Outcome::Skip("no compute device found".to_owned()),
            iterations: 0,
            items_processed: 0,
            total_seconds: 0.0,
            metrics: MetricSet::new(),
        };
        let mut buffer = Vec::new();
        JsonSink::new(&mut buffer).publish(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(std::str::from_utf8(&buffer).unwrap()).unwrap();
        assert_eq!(value["status"], "skip");
        assert_eq!(value["detail"], "no compute device found");
    }
}
