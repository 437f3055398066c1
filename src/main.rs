//! `jagannath-semck` — Naming and typing semantic analysis over a Jagannath
//! AST read as JSON. Parsing/lexing live upstream of this crate (§1).

use clap::Parser;
use jagannath_semck::diagnostics::rich;
use jagannath_semck::{ast::Program, CompilerOptions, CompilerSession};
use std::collections::HashMap;
use std::io::Read;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let mut options = CompilerOptions::parse();
    if let Some(config_path) = &options.config {
        match CompilerOptions::load_config(config_path) {
            Ok(config) => options.apply_config(config),
            Err(err) => {
                eprintln!("error reading {}: {err}", config_path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    let input_text = match &options.input {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                eprintln!("error reading {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => {
            let mut buf = String::new();
            if let Err(err) = std::io::stdin().read_to_string(&mut buf) {
                eprintln!("error reading stdin: {err}");
                return ExitCode::FAILURE;
            }
            buf
        }
    };

    let mut program: Program = match serde_json::from_str(&input_text) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("error parsing AST JSON: {err}");
            return ExitCode::FAILURE;
        }
    };

    let session = CompilerSession::new(options.target);
    let output = session.run(&mut program);

    if options.rich {
        let mut sources = HashMap::new();
        if let Some(source_path) = &options.source {
            match std::fs::read_to_string(source_path) {
                Ok(text) => {
                    sources.insert(source_path.display().to_string(), text);
                }
                Err(err) => {
                    eprintln!("error reading {}: {err}", source_path.display());
                }
            }
        }
        print!("{}", rich::render_all(&output.diagnostics, &sources));
    } else {
        for diagnostic in &output.diagnostics {
            println!("{diagnostic}");
        }
    }

    if let Some(emit_path) = &options.emit_ast {
        match serde_json::to_string_pretty(&program) {
            Ok(json) => {
                if let Err(err) = std::fs::write(emit_path, json) {
                    eprintln!("error writing {}: {err}", emit_path.display());
                    return ExitCode::FAILURE;
                }
            }
            Err(err) => {
                eprintln!("error serializing annotated AST: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    if output.diagnostics.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
