use std::fmt::Write;

use comfy_table::Cell;

use crate::artifact::{display_optional, Artifact};
use crate::event::FailureEvent;
use crate::pipeline::Stage;
use crate::text::or_not_provided;

use super::styling::{bright, bright_yellow, cyan, dim, severity};
use super::tables::{
    create_table, cyan_header, severity_cell, share_coded_duration_cell, share_percent,
};

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn add_text_section(output: &mut String, emoji: &str, title: &str, body: &str) {
    add_section_header(output, emoji, title);
    for line in body.lines() {
        let _ = writeln!(output, "  {line}");
    }
    output.push('\n');
}

fn depends_on(stage: Stage) -> String {
    let dependencies = stage.dependencies();
    if dependencies.is_empty() {
        "-".to_string()
    } else {
        dependencies
            .iter()
            .map(|dependency| dependency.role())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Renders a human-readable report of one pipeline run.
///
/// Sections, in order: overview, stage timings, technical analysis, root
/// cause, bug report, user story and severity.
#[allow(clippy::format_push_string)]
pub fn render_summary(event: &FailureEvent, artifact: &Artifact) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");
    output.push_str(&format!(
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("Error:"),
        cyan(&event.error_message),
        dim("Source:"),
        cyan(&event.source),
        dim("Test:"),
        cyan(or_not_provided(event.test_name.as_deref())),
        dim("Severity:"),
        severity(artifact.severity.level),
        dim("Total time:"),
        bright_yellow(format!("{}ms", artifact.total_ms)),
        dim("Slowest agent:"),
        bright_yellow(format!("{}ms", artifact.max_stage_ms())),
        dim("Generated:"),
        dim(artifact.generated_at.format("%Y-%m-%d %H:%M UTC"))
    ));

    add_section_header(&mut output, "⏱️", "Stage Timings");
    let mut timings = create_table();
    timings.set_header(cyan_header(&["Agent", "Depends on", "Duration", "Share"]));
    for (stage, ms) in artifact.stage_durations() {
        timings.add_row(vec![
            Cell::new(stage.role()),
            Cell::new(depends_on(stage)),
            share_coded_duration_cell(ms, artifact.total_ms),
            Cell::new(format!("{:.1}%", share_percent(ms, artifact.total_ms))),
        ]);
    }
    output.push_str(&format!("{timings}\n\n"));

    add_text_section(
        &mut output,
        "🔬",
        "Technical Analysis",
        &artifact.technical_analysis.payload,
    );
    add_text_section(&mut output, "🎯", "Root Cause", &artifact.root_cause.payload);

    let bug = &artifact.bug_report;
    add_section_header(&mut output, "🐛", "Bug Report");
    let mut bug_table = create_table();
    bug_table.set_header(cyan_header(&["Field", "Value"]));
    bug_table.add_row(vec![Cell::new("Title"), Cell::new(&bug.title)]);
    bug_table.add_row(vec![Cell::new("Description"), Cell::new(&bug.description)]);
    bug_table.add_row(vec![
        Cell::new("Steps to reproduce"),
        Cell::new(&bug.steps_to_reproduce),
    ]);
    bug_table.add_row(vec![Cell::new("Expected"), Cell::new(&bug.expected_behavior)]);
    bug_table.add_row(vec![Cell::new("Actual"), Cell::new(&bug.actual_behavior)]);
    bug_table.add_row(vec![
        Cell::new("Confidence"),
        Cell::new(display_optional(bug.confidence)),
    ]);
    output.push_str(&format!("{bug_table}\n\n"));

    let story = &artifact.user_story;
    add_section_header(&mut output, "📖", "User Story");
    let mut story_table = create_table();
    story_table.set_header(cyan_header(&["Field", "Value"]));
    story_table.add_row(vec![Cell::new("Story"), Cell::new(&story.description)]);
    story_table.add_row(vec![Cell::new("What to do"), Cell::new(&story.what_to_do)]);
    story_table.add_row(vec![
        Cell::new("Acceptance criteria"),
        Cell::new(&story.acceptance_criteria),
    ]);
    story_table.add_row(vec![
        Cell::new("Additional information"),
        Cell::new(&story.additional_information),
    ]);
    story_table.add_row(vec![
        Cell::new("Confidence"),
        Cell::new(display_optional(story.confidence)),
    ]);
    output.push_str(&format!("{story_table}\n\n"));

    add_section_header(&mut output, "🚨", "Severity");
    let mut severity_table = create_table();
    severity_table.set_header(cyan_header(&["Level", "Rationale", "Confidence"]));
    severity_table.add_row(vec![
        severity_cell(artifact.severity.level),
        Cell::new(&artifact.severity.rationale),
        Cell::new(display_optional(artifact.severity.confidence)),
    ]);
    output.push_str(&format!("{severity_table}\n"));

    output
}
