use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_red, bright_yellow};

/// Spinner shown on stderr while the agent pipeline runs.
pub struct PipelineProgress {
    pb: ProgressBar,
}

impl PipelineProgress {
    pub fn start() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Agents").underlined());
        let pb = create_spinner(
            bright_yellow("Running technical analysis, root cause and writers").to_string(),
        );
        Self { pb }
    }

    pub fn finish(self, total_ms: u64) {
        self.pb.finish_with_message(
            bright_green(format!("Agent pipeline completed in {total_ms}ms ✓")).to_string(),
        );
        eprintln!();
    }

    pub fn fail(self) {
        self.pb
            .abandon_with_message(bright_red("Agent pipeline failed ✗").to_string());
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    let style = ProgressStyle::default_spinner()
        .template("  {msg} {spinner} {elapsed}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
