//! Progress display helpers for long-running chunk/fetch/apply operations.

use std::time::{Duration, Instant};

/// Determinate progress bar over a count of units (blocks, bundles, files).
pub struct UnitProgress {
    bar: indicatif::ProgressBar,
    start_time: Instant,
}

impl UnitProgress {
    pub fn new(total: u64, label: &str) -> Self {
        use indicatif::{ProgressBar, ProgressStyle};

        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("█▓▒░  "),
        );
        bar.set_message(label.to_string());

        Self {
            bar,
            start_time: Instant::now(),
        }
    }

    pub fn set_position(&self, pos: u64) {
        self.bar.set_position(pos);
    }

    pub fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    pub fn finish_success(&self, msg: &str) {
        let elapsed = self.start_time.elapsed();
        self.bar
            .finish_with_message(format!("{msg} ({})", format_duration(elapsed)));
    }

    pub fn finish_error(&self, msg: &str) {
        self.bar.abandon_with_message(format!("failed: {msg}"));
    }
}

/// Spinner for indeterminate operations (directory scans, changelog loads).
pub struct Spinner {
    spinner: indicatif::ProgressBar,
}

impl Spinner {
    pub fn new(msg: &str) -> Self {
        use indicatif::{ProgressBar, ProgressStyle};

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        spinner.set_message(msg.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));

        Self { spinner }
    }

    pub fn finish_success(&self, msg: &str) {
        self.spinner.finish_with_message(msg.to_string());
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_switches_units_at_a_minute() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }
}
