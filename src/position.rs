//! Source positions (Sthāna - स्थान).
//!
//! Lexing/parsing live outside this crate; the parser hands us an AST whose
//! nodes already carry positions. We only need to compare and print them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single point in a source file: 1-indexed line and column, plus an
/// optional file name for multi-file diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column, file: None }
    }

    pub fn in_file(line: u32, column: u32, file: impl Into<String>) -> Self {
        Self { line, column, file: Some(file.into()) }
    }

    /// Dummy position for synthesized nodes (none are created by this crate,
    /// but tests build fixtures without a real parser).
    pub fn dummy() -> Self {
        Self { line: 0, column: 0, file: None }
    }

    fn sort_key(&self) -> (u32, u32) {
        (self.line, self.column)
    }
}

/// Positions order by `(line, column)` only; `file` never participates, since
/// the diagnostic sink's finalization sort is per spec §5: "a stable sort by
/// (line, column) on finalization normalizes cross-class ordering."
impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.line, self.column)
    }
}
