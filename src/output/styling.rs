use console::{style, StyledObject};

use crate::artifact::SeverityLevel;

pub fn bright_yellow(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Red for blockers and criticals, yellow for majors, green otherwise.
pub fn severity(level: SeverityLevel) -> StyledObject<String> {
    match level {
        SeverityLevel::Blocker | SeverityLevel::Critical => bright_red(level).bold(),
        SeverityLevel::Major => bright_yellow(level),
        SeverityLevel::Minor => bright_green(level),
    }
}
