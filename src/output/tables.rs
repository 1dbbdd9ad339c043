use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::artifact::SeverityLevel;

pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Colors a stage duration by its share of the whole run.
pub fn share_coded_duration_cell(stage_ms: u64, total_ms: u64) -> Cell {
    let share = share_percent(stage_ms, total_ms);
    let text = format!("{stage_ms}ms");
    if share >= 50.0 {
        Cell::new(text).fg(TableColor::Red)
    } else if share >= 25.0 {
        Cell::new(text).fg(TableColor::Yellow)
    } else {
        Cell::new(text).fg(TableColor::Green)
    }
}

pub fn severity_cell(level: SeverityLevel) -> Cell {
    let color = match level {
        SeverityLevel::Blocker | SeverityLevel::Critical => TableColor::Red,
        SeverityLevel::Major => TableColor::Yellow,
        SeverityLevel::Minor => TableColor::Green,
    };
    Cell::new(level).fg(color)
}

#[allow(clippy::cast_precision_loss)]
pub fn share_percent(part_ms: u64, total_ms: u64) -> f64 {
    if total_ms == 0 {
        0.0
    } else {
        (part_ms as f64 / total_ms as f64) * 100.0
    }
}
