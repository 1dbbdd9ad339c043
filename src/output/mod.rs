mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::write_artifact;
pub use progress::PipelineProgress;
pub use styling::{dim, magenta_bold};

/// Prints the `storywriter` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📝 storywriter"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Test failure to bug report and user story")
    );
}
