use anyhow::Result;
use std::io::Write;

use crate::artifact::Artifact;
use crate::config::OutputFormat;
use crate::event::FailureEvent;

use super::summary::render_summary;

/// Writes a finished artifact in the requested format.
///
/// JSON carries the artifact exactly as serialized (camelCase fields);
/// the summary is the same report printed to the terminal.
pub fn write_artifact(
    event: &FailureEvent,
    artifact: &Artifact,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Json => export_json(artifact, pretty, output),
        OutputFormat::Summary => {
            write!(output, "{}", render_summary(event, artifact))?;
            Ok(())
        }
    }
}

fn export_json(artifact: &Artifact, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(artifact)?
    } else {
        serde_json::to_string(artifact)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}
