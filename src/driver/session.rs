//! Compiler session: the two-phase pipeline a CLI or test harness drives.

use super::options::Target;
use crate::ast::Program;
use crate::diagnostics::Diagnostic;
use crate::naming;
use crate::symbols::{SymbolId, SymbolTable};
use crate::typing;
use tracing::{info, instrument};

pub struct CompileOutput {
    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
    pub main_method: Option<SymbolId>,
}

pub struct CompilerSession {
    target: Target,
}

impl CompilerSession {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    /// Runs Naming, then Typing if `target` asks for it and Naming reported
    /// nothing (§6 driver contract).
    #[instrument(skip_all)]
    pub fn run(&self, program: &mut Program) -> CompileOutput {
        info!(target = ?self.target, "starting semantic analysis");
        let naming_result = naming::run(program);
        let mut symbols = naming_result.symbols;
        let mut diagnostics = naming_result.diagnostics;

        if self.target == Target::TypeCheck && diagnostics.is_empty() {
            let typing_result = typing::run(program, &mut symbols);
            diagnostics = typing_result.diagnostics;
        } else if self.target == Target::TypeCheck {
            info!("skipping typing: naming reported {} diagnostic(s)", diagnostics.len());
        }

        CompileOutput { symbols, diagnostics, main_method: naming_result.main_method }
    }
}
