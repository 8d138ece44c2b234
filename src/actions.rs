//! Workflow-runner conventions: step outputs, failure annotations and the
//! runner's debug flag.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Variable the runner sets to `1` when debug logging is enabled
pub const ENV_RUNNER_DEBUG: &str = "RUNNER_DEBUG";

/// Append `name=value` lines to the step output file
pub fn write_outputs(path: &Path, outputs: &[(&str, &str)]) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for (name, value) in outputs {
        writeln!(file, "{}={}", name, value.replace(['\r', '\n'], " "))?;
    }
    Ok(())
}

/// `::error::` workflow command marking the step failed
pub fn error_command(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

/// Whether the runner asked for debug logs
pub fn runner_debug(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("1" | "true"))
}

fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
