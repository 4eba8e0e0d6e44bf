//! Terminal output for tuning reports.

use serde::Serialize;
use tuner_core::TuningReport;

/// Width of the text meter, odd so that "in tune" has its own cell.
const METER_WIDTH: usize = 21;

#[derive(Serialize)]
struct TimedReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<f32>,
    #[serde(flatten)]
    report: &'a TuningReport,
}

/// One-line text meter: `[----------|---*------]`.
pub fn meter_bar(meter: f32) -> String {
    let last = (METER_WIDTH - 1) as f32;
    let pos = ((meter.clamp(0.0, 100.0) / 100.0) * last).round() as usize;
    let centre = METER_WIDTH / 2;
    let cells: String = (0..METER_WIDTH)
        .map(|i| match i {
            _ if i == pos => '*',
            _ if i == centre => '|',
            _ => '-',
        })
        .collect();
    format!("[{}]", cells)
}

/// Human-readable report line, prefixed with the stream time when known.
pub fn format_text(report: &TuningReport, time: Option<f32>) -> String {
    let line = format!(
        "{:>4} {:8.2} Hz  ref {:7.2} Hz  {:+6.1} cents  {}",
        report.note,
        report.frequency,
        report.reference_freq,
        report.cents,
        meter_bar(report.meter)
    );
    match time {
        Some(t) => format!("{:7.2}s {}", t, line),
        None => line,
    }
}

pub fn format_json(report: &TuningReport, time: Option<f32>) -> serde_json::Result<String> {
    serde_json::to_string(&TimedReport { time, report })
}

/// Prints a report to stdout in the selected format.
pub fn print(report: &TuningReport, json: bool, time: Option<f32>) {
    if json {
        match format_json(report, time) {
            Ok(line) => println!("{}", line),
            Err(e) => log::error!("failed to serialize report: {}", e),
        }
    } else {
        println!("{}", format_text(report, time));
    }
}
