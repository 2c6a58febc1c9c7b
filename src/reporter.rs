//! Sync Report Rendering
//!
//! Pure formatting of a `SyncReport`; no decision is taken here. The sync
//! checker calls a `Reporter` once per check, so output can be swapped or
//! silenced without touching the check result.

use std::sync::Arc;

use crate::models::{EndpointStatus, SyncClassification, SyncReport, SyncVerdict};

// ANSI SGR codes
const GREEN: &str = "32";
const YELLOW: &str = "33";
const RED: &str = "31";
const BOLD_RED: &str = "1;31";
const BOLD_CYAN: &str = "1;36";
const BLUE: &str = "34";
const DIM: &str = "2";

/// Receives every finished sync report
pub trait Reporter: Send + Sync {
    fn report(&self, report: &SyncReport);
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn report(&self, report: &SyncReport) {
        (**self).report(report)
    }
}

/// Prints the report to stdout
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    color: bool,
}

impl ConsoleReporter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, report: &SyncReport) {
        for line in render_report(report, self.color) {
            println!("{}", line);
        }
    }
}

/// Discards reports
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&self, _report: &SyncReport) {}
}

/// Header, one line per endpoint, then the verdict
pub fn render_report(report: &SyncReport, color: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.statuses.len() + 2);
    lines.push(paint(
        &format!(
            "🔍 RPC sync check @ {} | max block {}",
            report.checked_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.max_height
        ),
        DIM,
        color,
    ));
    for status in &report.statuses {
        lines.push(render_status_line(status, report.max_height, color));
    }
    lines.push(render_verdict(report, color));
    lines
}

/// `<height> (<delta>) - <endpoint>`
pub fn render_status_line(status: &EndpointStatus, max_height: u64, color: bool) -> String {
    let (height, delta) = match (status.height, status.delta(max_height)) {
        (Some(h), Some(0)) => (h.to_string(), "0".to_string()),
        (Some(h), Some(d)) => (h.to_string(), format!("{:+}", d)),
        _ => ("unreachable".to_string(), "n/a".to_string()),
    };

    let height_code = match status.classification {
        SyncClassification::UpToDate => GREEN,
        SyncClassification::OneBehind => YELLOW,
        SyncClassification::Stale => RED,
        SyncClassification::Unreachable => BOLD_RED,
    };
    let endpoint_code = if status.is_main { BOLD_CYAN } else { BLUE };
    let label = if status.is_main {
        format!("{} (main)", status.endpoint)
    } else {
        status.endpoint.clone()
    };

    format!(
        "{} {} ({}) - {}",
        status.classification.emoji(),
        paint(&height, height_code, color),
        delta,
        paint(&label, endpoint_code, color)
    )
}

/// Final one-line verdict for the main endpoint
pub fn render_verdict(report: &SyncReport, color: bool) -> String {
    let main = &report.main_endpoint;
    match &report.verdict {
        SyncVerdict::Healthy => paint(
            &format!("✅ {} is up to date (block {})", main, report.max_height),
            GREEN,
            color,
        ),
        SyncVerdict::Warning => paint(
            &format!(
                "⚠️  {} is 1 block behind ({}/{})",
                main,
                report.max_height.saturating_sub(1),
                report.max_height
            ),
            YELLOW,
            color,
        ),
        SyncVerdict::MainUnreachable | SyncVerdict::MainTooFarBehind { .. } => {
            let message = report
                .verdict_error()
                .map(|e| e.message)
                .unwrap_or_default();
            paint(&format!("❌ {}", message), BOLD_RED, color)
        }
    }
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn status(label: &str, height: Option<u64>, is_main: bool, max: u64) -> EndpointStatus {
        EndpointStatus {
            endpoint: label.to_string(),
            height,
            is_main,
            classification: SyncClassification::classify(height, max),
        }
    }

    fn report(verdict: SyncVerdict, main_height: Option<u64>) -> SyncReport {
        SyncReport {
            max_height: 100,
            main_endpoint: "A".to_string(),
            statuses: vec![
                status("A", main_height, true, 100),
                status("B", Some(100), false, 100),
                status("C", None, false, 100),
            ],
            verdict,
            checked_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_lines_plain() {
        let r = report(SyncVerdict::Warning, Some(99));
        let lines = render_report(&r, false);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "🟡 99 (-1) - A (main)");
        assert_eq!(lines[2], "✅ 100 (0) - B");
        assert_eq!(lines[3], "💀 unreachable (n/a) - C");
        assert_eq!(lines[4], "⚠️  A is 1 block behind (99/100)");
    }

    #[test]
    fn test_fatal_verdict_line() {
        let r = report(SyncVerdict::MainTooFarBehind { height: 97 }, Some(97));
        assert_eq!(render_verdict(&r, false), "❌ A is at block 97/100");

        let r = report(SyncVerdict::MainUnreachable, None);
        assert_eq!(render_verdict(&r, false), "❌ A is probably down");
    }

    #[test]
    fn test_colored_output_wraps_codes() {
        let s = status("B", Some(100), false, 100);
        let line = render_status_line(&s, 100, true);
        assert!(line.contains("\x1b[32m100\x1b[0m"));
        assert!(line.contains("\x1b[34mB\x1b[0m"));
    }
}
