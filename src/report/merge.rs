//! Merging of per-process result fragments into one report.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::types::{AggregateReport, Stats};
use super::{ReportError, ReportResult};

/// Fragment files matching `pattern`, sorted by path
pub fn find_fragments(pattern: &str) -> ReportResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "skipping unreadable report fragment"),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read every fragment matching `pattern` and merge them.
///
/// Returns [`ReportError::NoReports`] when nothing matches.
pub fn merge_fragments(pattern: &str) -> ReportResult<AggregateReport> {
    let paths = find_fragments(pattern)?;

    debug!(
        "found mochawesome files: {}",
        paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    );

    if paths.is_empty() {
        return Err(ReportError::NoReports {
            pattern: pattern.to_string(),
        });
    }

    debug!("merging {} mochawesome reports", paths.len());

    let fragments = paths
        .iter()
        .map(|path| read_fragment(path))
        .collect::<ReportResult<Vec<_>>>()?;

    Ok(merge(fragments))
}

/// Parse one fragment file
pub fn read_fragment(path: &Path) -> ReportResult<AggregateReport> {
    let raw = fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ReportError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge parsed fragments in the given order.
///
/// Results are concatenated, counters summed, the time window widened to
/// cover every fragment and percentages recomputed. `meta` and unknown
/// top-level fields come from the first fragment that has them.
pub fn merge(fragments: Vec<AggregateReport>) -> AggregateReport {
    let stats = merge_stats(fragments.iter().map(|f| &f.stats));
    let mut merged = AggregateReport {
        stats,
        ..AggregateReport::default()
    };

    for fragment in fragments {
        if merged.meta.is_none() {
            merged.meta = fragment.meta;
        }
        for (key, value) in fragment.extra {
            merged.extra.entry(key).or_insert(value);
        }
        merged.results.extend(fragment.results);
    }

    merged
}

fn merge_stats<'a>(all: impl Iterator<Item = &'a Stats>) -> Stats {
    let mut merged = Stats::default();

    for stats in all {
        merged.suites += stats.suites;
        merged.tests += stats.tests;
        merged.passes += stats.passes;
        merged.pending += stats.pending;
        merged.failures += stats.failures;
        merged.duration += stats.duration;
        merged.tests_registered += stats.tests_registered;
        merged.other += stats.other;
        merged.skipped += stats.skipped;
        merged.has_other |= stats.has_other;
        merged.has_skipped |= stats.has_skipped;

        merged.start = match (merged.start, stats.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        merged.end = match (merged.end, stats.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    let ran = merged.tests_registered.saturating_sub(merged.pending);
    merged.pass_percent = percent(merged.passes, ran);
    merged.pending_percent = percent(merged.pending, merged.tests_registered);

    merged
}

/// `part / whole` as a percentage with one decimal, 0 for an empty whole
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

/// Write the merged report as pretty JSON
pub fn write_json(report: &AggregateReport, path: &Path) -> ReportResult<()> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(report).map_err(|source| ReportError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_err)
}
