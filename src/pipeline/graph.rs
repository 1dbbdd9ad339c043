use std::fmt;

use serde::{Deserialize, Serialize};

/// One node of the agent dependency graph.
///
/// ```text
/// TechnicalAnalysis ──► RootCause ──┬──► BugWriter    (+ TechnicalAnalysis)
///                                   ├──► StoryWriter
///                                   └──► Severity     (+ TechnicalAnalysis)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    TechnicalAnalysis,
    RootCause,
    BugWriter,
    StoryWriter,
    Severity,
}

impl Stage {
    /// All stages in a valid topological order.
    pub const ALL: [Self; 5] = [
        Self::TechnicalAnalysis,
        Self::RootCause,
        Self::BugWriter,
        Self::StoryWriter,
        Self::Severity,
    ];

    /// Stages whose output must exist before this one may start.
    pub fn dependencies(self) -> &'static [Self] {
        match self {
            Self::TechnicalAnalysis => &[],
            Self::RootCause => &[Self::TechnicalAnalysis],
            Self::BugWriter | Self::Severity => &[Self::TechnicalAnalysis, Self::RootCause],
            Self::StoryWriter => &[Self::RootCause],
        }
    }

    /// Label passed to the generation backend and used in logs.
    pub fn role(self) -> &'static str {
        match self {
            Self::TechnicalAnalysis => "TechnicalAnalyzer",
            Self::RootCause => "RootCause",
            Self::BugWriter => "BugWriter",
            Self::StoryWriter => "StoryWriter",
            Self::Severity => "Severity",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.role())
    }
}
