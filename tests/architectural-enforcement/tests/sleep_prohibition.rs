//! Integration Test: Sleep Prohibition
//!
//! **Policy**: production code MUST NOT park threads with
//! `std::thread::sleep`. Waiting belongs to channels, `Notify` or
//! `tokio::time`, and only where a real deadline exists.

use architectural_enforcement::{code_part, production_sources, PRODUCTION_DIRS};

#[test]
fn test_no_thread_sleep_in_production_code() {
    let violations: Vec<String> = PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| production_sources(dir))
        .flat_map(|file| {
            file.lines
                .iter()
                .enumerate()
                .filter(|(_, line)| code_part(line).contains("thread::sleep"))
                .map(|(idx, _)| file.violation(idx, "Thread sleep"))
                .collect::<Vec<_>>()
        })
        .collect();

    assert!(
        violations.is_empty(),
        "\nFound thread sleeps in production code:\n  {}\n",
        violations.join("\n  ")
    );
}
