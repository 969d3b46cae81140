//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async code MUST NOT block the runtime.
//! **Required**: `tokio::fs`, `tokio::net`, `tokio::io`, async `reqwest`.
//!
//! Blocking calls are acceptable in plain `fn`s that run before or outside
//! the runtime (configuration loading, argument parsing).

use architectural_enforcement::{code_part, enclosing_fn, production_sources, Enclosing, PRODUCTION_DIRS};

/// Calls that block the calling thread
const BLOCKING_CALLS: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::TcpStream", "Blocking network I/O"),
    ("std::net::TcpListener", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::io::stdout()", "Blocking stdout"),
    (".read_line(", "Blocking stdin"),
];

#[test]
fn test_no_blocking_io_in_async_functions() {
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for file in production_sources(dir) {
            for (idx, line) in file.lines.iter().enumerate() {
                let code = code_part(line);

                // The blocking client is never acceptable
                if code.contains("reqwest::blocking") {
                    violations.push(file.violation(idx, "Blocking HTTP client"));
                }

                if enclosing_fn(&file.lines, idx) != Enclosing::AsyncFn {
                    continue;
                }
                for (pattern, kind) in BLOCKING_CALLS {
                    if code.contains(pattern) {
                        violations.push(file.violation(idx, kind));
                    }
                }
            }
        }
    }

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O calls found in async code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::fs, tokio::net, tokio::io or async reqwest instead.");

        panic!(
            "\nFound {} blocking I/O violation(s) in production code.",
            violations.len()
        );
    }
}

#[test]
fn test_production_sources_are_found() {
    // Guards against the scan silently checking nothing
    let files: usize = PRODUCTION_DIRS
        .iter()
        .map(|dir| production_sources(dir).len())
        .sum();
    assert!(files >= 10, "Expected to scan the workspace sources, found {files} files");
}
