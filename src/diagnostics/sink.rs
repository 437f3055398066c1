//! Diagnostic sink (§4.3): an append-only collector, sorted by position only
//! on finalization so that passes can emit in AST traversal order without
//! worrying about cross-class interleaving.

use super::Diagnostic;

#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emission never fails and never stops the caller; a statement can
    /// raise several diagnostics.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Stable sort by `(line, column)`, per §5's ordering guarantee. Stable
    /// so that diagnostics at the same position keep their relative
    /// emission order.
    pub fn finalize(mut self) -> Vec<Diagnostic> {
        self.diagnostics.sort_by(|a, b| a.position.cmp(&b.position));
        self.diagnostics
    }
}
