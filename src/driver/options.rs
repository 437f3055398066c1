//! Compiler options (ambient config, SPEC_FULL "Configuration"): CLI flags
//! via `clap`, overlaid on an optional `jagannath.toml` file via `toml`, so a
//! project can pin defaults without repeating flags on every invocation.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::path::PathBuf;

/// What the driver should run. `TypeCheck` implies `NameResolution` runs
/// first (§6); it never runs Typing on a program Naming already rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    NameResolution,
    TypeCheck,
}

impl Default for Target {
    fn default() -> Self {
        Target::TypeCheck
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "jagannath-semck", about = "Naming and typing semantic analysis for Jagannath ASTs")]
pub struct CompilerOptions {
    /// Path to the input AST, as JSON (§6 "Input"). Reads stdin if omitted.
    pub input: Option<PathBuf>,

    /// Which pass(es) to run.
    #[arg(long, value_enum, default_value = "type-check")]
    pub target: Target,

    /// Render diagnostics with `ariadne` instead of the compact oracle form.
    #[arg(long)]
    pub rich: bool,

    /// Write the annotated AST (with inferred types/symbols) to this path.
    #[arg(long)]
    pub emit_ast: Option<PathBuf>,

    /// Path to a `jagannath.toml` overlay; CLI flags still win over it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Original source text, for `--rich` diagnostic rendering. Without it,
    /// `--rich` falls back to the compact form (see `diagnostics::rich`).
    #[arg(long)]
    pub source: Option<PathBuf>,

    #[arg(long)]
    pub verbose: bool,
}

/// The subset of [`CompilerOptions`] that can come from a config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub target: Option<Target>,
    pub rich: Option<bool>,
    pub verbose: Option<bool>,
}

impl CompilerOptions {
    /// Applies a parsed `jagannath.toml`, letting fields the user didn't
    /// pass on the command line fall back to the file.
    pub fn apply_config(&mut self, config: ConfigFile) {
        if let Some(target) = config.target {
            self.target = target;
        }
        if let Some(rich) = config.rich {
            self.rich = self.rich || rich;
        }
        if let Some(verbose) = config.verbose {
            self.verbose = self.verbose || verbose;
        }
    }

    pub fn load_config(path: &std::path::Path) -> Result<ConfigFile, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
