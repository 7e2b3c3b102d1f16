use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Get a standardized spinner style
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Spinner shown while an image is being processed.
pub fn processing_spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner()
        .with_style(spinner_style())
        .with_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
