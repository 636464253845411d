use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar};
use owo_colors::OwoColorize;
use std::time::Duration;

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stdout().is_term() {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        Self { pb }
    }

    /// Clear the spinner without a summary, e.g. before an error is shown
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }

    /// Clear the spinner and print the closing line of a repair run
    pub fn finish_with_summary(&self, duration: Duration, files: usize, removed: usize) {
        self.pb.finish_and_clear();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {}  {} {}",
            Icons::FILE.style(theme().info.clone()),
            files,
            Icons::DEL.style(theme().info.clone()),
            removed
        );
    }
}
