//! Integration Test: Stdout Prohibition
//!
//! **Policy**: the core library MUST NOT write to stdout outside the pipe
//! transport's writer. Stdout carries JSON-RPC frames; one stray line
//! corrupts the protocol stream. Logs go through `tracing` to stderr.

use architectural_enforcement::{code_part, invokes_macro, production_sources};

const STDOUT_MACROS: &[&str] = &["print!", "println!", "dbg!"];

#[test]
fn test_core_library_never_prints_to_stdout() {
    let mut violations = Vec::new();

    for file in production_sources("codegen/core/src") {
        for (idx, line) in file.lines.iter().enumerate() {
            let code = code_part(line);
            if STDOUT_MACROS.iter().any(|m| invokes_macro(code, m)) {
                violations.push(file.violation(idx, "Stdout macro"));
            }
            if code.contains("std::io::stdout") {
                violations.push(file.violation(idx, "Blocking stdout handle"));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "\nFound stdout writes in the core library:\n  {}\n",
        violations.join("\n  ")
    );
}

#[test]
fn test_logging_subscriber_writes_to_stderr() {
    let main = architectural_enforcement::workspace_root().join("codegen/daemon/src/main.rs");
    let source = std::fs::read_to_string(&main).expect("daemon main.rs should exist");
    assert!(
        source.contains(".with_writer(std::io::stderr)"),
        "The tracing subscriber must write to stderr"
    );
}
