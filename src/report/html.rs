//! Standalone HTML rendering of a merged report.
//!
//! The page pulls the mochawesome report app from a CDN and feeds it the
//! embedded report JSON with charts enabled. A static summary, an inline SVG
//! outcome bar and the list of failures are rendered server-side so the page
//! still says something useful when scripts are blocked.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{AggregateReport, Stats};

/// Report app release whose assets are referenced from the CDN
pub const REPORT_APP_VERSION: &str = "6.2.0";

/// CDN base for the report app assets
pub const REPORT_APP_CDN: &str = "https://unpkg.com/mochawesome-report-generator";

/// Page title
const REPORT_TITLE: &str = "Mochawesome Report";

const BAR_WIDTH: u64 = 600;
const BAR_HEIGHT: u64 = 16;

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors raised while rendering the HTML report
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The merged document has no results to render
    #[error("failed to generate report: merged document has no results")]
    EmptyReport,

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render `report` and write it to `path`, creating parent directories
pub fn render_html(report: &AggregateReport, path: &Path) -> RenderResult<PathBuf> {
    let html = render_to_string(report)?;

    let io_err = |source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, html).map_err(io_err)?;

    debug!("generated mochawesome HTML at {}", path.display());
    Ok(path.to_path_buf())
}

/// Render `report` to an HTML string
pub fn render_to_string(report: &AggregateReport) -> RenderResult<String> {
    if report.results.is_empty() {
        return Err(RenderError::EmptyReport);
    }

    let raw = serde_json::to_string(report)?;
    let config = serde_json::json!({
        "reportTitle": REPORT_TITLE,
        "reportPageTitle": REPORT_TITLE,
        "charts": true,
        "cdn": true,
        "inline": false,
        "showPassed": true,
        "showFailed": true,
        "showPending": true,
        "showSkipped": false,
        "showHooks": "failed",
    });

    let mut html = String::new();
    html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape_html(REPORT_TITLE));
    let _ = writeln!(
        html,
        "<link rel=\"stylesheet\" href=\"{REPORT_APP_CDN}@{REPORT_APP_VERSION}/dist/app.css\">"
    );
    html.push_str("</head>\n");

    let _ = writeln!(
        html,
        "<body data-raw=\"{}\" data-config=\"{}\">",
        escape_html(&raw),
        escape_html(&config.to_string())
    );

    html.push_str("<noscript>\n<main class=\"static-report\">\n");
    let _ = writeln!(html, "<h1>{}</h1>", escape_html(REPORT_TITLE));
    render_summary(&mut html, &report.stats);
    render_outcome_bar(&mut html, &report.stats);
    render_failures(&mut html, report);
    html.push_str("</main>\n</noscript>\n");

    html.push_str("<div id=\"report\"></div>\n");
    let _ = writeln!(
        html,
        "<script src=\"{REPORT_APP_CDN}@{REPORT_APP_VERSION}/dist/app.js\"></script>"
    );
    html.push_str("</body>\n</html>\n");

    Ok(html)
}

fn render_summary(html: &mut String, stats: &Stats) {
    html.push_str("<table class=\"summary\">\n");
    let rows: [(&str, String); 7] = [
        ("Suites", stats.suites.to_string()),
        ("Tests", stats.tests.to_string()),
        ("Passes", stats.passes.to_string()),
        ("Failures", stats.failures.to_string()),
        ("Pending", stats.pending.to_string()),
        ("Skipped", stats.skipped.to_string()),
        ("Duration", format!("{} ms", stats.duration)),
    ];
    for (label, value) in rows {
        let _ = writeln!(html, "<tr><th>{label}</th><td>{}</td></tr>", escape_html(&value));
    }
    if let (Some(start), Some(end)) = (stats.start, stats.end) {
        let _ = writeln!(
            html,
            "<tr><th>Window</th><td>{} &ndash; {}</td></tr>",
            start.to_rfc3339(),
            end.to_rfc3339()
        );
    }
    html.push_str("</table>\n");
}

/// Horizontal passes/failures/pending bar
fn render_outcome_bar(html: &mut String, stats: &Stats) {
    let total = stats.passes + stats.failures + stats.pending;
    let _ = writeln!(
        html,
        "<svg class=\"chart\" width=\"{BAR_WIDTH}\" height=\"{BAR_HEIGHT}\" role=\"img\" aria-label=\"{} passed, {} failed, {} pending\">",
        stats.passes, stats.failures, stats.pending
    );
    if total == 0 {
        let _ = writeln!(
            html,
            "<rect x=\"0\" y=\"0\" width=\"{BAR_WIDTH}\" height=\"{BAR_HEIGHT}\" fill=\"#cccccc\"/>"
        );
    } else {
        let mut x = 0;
        for (count, color) in [
            (stats.passes, "#4caf50"),
            (stats.failures, "#f44336"),
            (stats.pending, "#03a9f4"),
        ] {
            let width = count * BAR_WIDTH / total;
            if width > 0 {
                let _ = writeln!(
                    html,
                    "<rect x=\"{x}\" y=\"0\" width=\"{width}\" height=\"{BAR_HEIGHT}\" fill=\"{color}\"/>"
                );
            }
            x += width;
        }
    }
    html.push_str("</svg>\n");
}

fn render_failures(html: &mut String, report: &AggregateReport) {
    let failed = report.failed_tests();
    if failed.is_empty() {
        return;
    }
    let _ = writeln!(html, "<h2>Failures ({})</h2>\n<ol class=\"failures\">", failed.len());
    for test in failed {
        let _ = write!(html, "<li><strong>{}</strong>", escape_html(&test.full_title));
        if let Some(message) = &test.err.message {
            let _ = write!(html, "<pre>{}</pre>", escape_html(message));
        }
        html.push_str("</li>\n");
    }
    html.push_str("</ol>\n");
}

/// Escape text for HTML element content and double-quoted attributes
pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
