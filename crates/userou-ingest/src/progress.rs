//! Progress reporting for long loads

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for the record loop
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Format a duration as `HH h MM min SS s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02} h {:02} min {:02} s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Final line printed after a run
pub fn report(records: u64, elapsed: Duration) -> String {
    format!("Processed {} records in {}", records, format_elapsed(elapsed))
}
