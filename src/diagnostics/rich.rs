//! Rich, human-facing diagnostic rendering via `ariadne`.
//!
//! This is purely a presentation layer on top of [`super::Diagnostic`]; the
//! CLI binary uses it for terminal output, but nothing in the oracle-checked
//! compact format (`Display` on `Diagnostic`) depends on it. Byte offsets are
//! reconstructed from the AST's `(line, column)` positions against the
//! original source text, since positions on the wire never carry offsets.
//! When the source text for a diagnostic's file isn't available, it falls
//! back to the compact line.

use super::Diagnostic;
use ariadne::{Color, Label, Report, ReportKind, Source};
use std::collections::HashMap;

/// Renders every diagnostic whose file has matching source text in `sources`
/// (keyed by file name, with `None` meaning "no file given") as an `ariadne`
/// report; anything else falls back to the compact `*** Error at (L,C): ..`
/// line.
pub fn render_all(diagnostics: &[Diagnostic], sources: &HashMap<String, String>) -> String {
    let mut out = String::new();
    for diag in diagnostics {
        match diag.position.file.as_ref().and_then(|f| sources.get(f)) {
            Some(text) => render_one(diag, diag.position.file.clone().unwrap(), text, &mut out),
            None => out.push_str(&format!("{}\n", diag)),
        }
    }
    out
}

fn render_one(diag: &Diagnostic, file: String, text: &str, out: &mut String) {
    let offset = byte_offset(text, diag.position.line, diag.position.column);
    let message = diag.kind.to_string();

    let mut buf = Vec::new();
    let report = Report::build(ReportKind::Error, file.clone(), offset)
        .with_message(&message)
        .with_label(
            Label::new((file.clone(), offset..(offset + 1).min(text.len())))
                .with_message(&message)
                .with_color(Color::Red),
        )
        .finish();
    if report.write((file, Source::from(text)), &mut buf).is_ok() {
        out.push_str(&String::from_utf8_lossy(&buf));
    } else {
        out.push_str(&format!("{}\n", diag));
    }
}

fn byte_offset(text: &str, line: u32, column: u32) -> usize {
    let mut offset = 0;
    for (i, l) in text.split('\n').enumerate() {
        if i as u32 + 1 == line {
            return offset + (column.saturating_sub(1) as usize).min(l.len());
        }
        offset += l.len() + 1;
    }
    text.len()
}
