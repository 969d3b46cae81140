//! Architectural Enforcement Integration Tests
//!
//! This package contains source-level policy tests for the workspace:
//! - No blocking I/O inside async functions
//! - No thread sleeps in production code
//! - No stdout writes from the core library (stdout is the pipe transport)
//!
//! The helpers here read production sources only: everything from a file's
//! first `#[cfg(test)]` onward is treated as test code and skipped.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories checked by the policy tests
pub const PRODUCTION_DIRS: &[&str] = &["codegen/core/src", "codegen/daemon/src"];

/// A source file reduced to its production lines
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path of the file
    pub path: PathBuf,
    /// Lines before the first `#[cfg(test)]`
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Parse source text, dropping the trailing test section
    pub fn from_source(path: impl Into<PathBuf>, source: &str) -> Self {
        let lines = source
            .lines()
            .take_while(|line| !line.trim_start().starts_with("#[cfg(test)]"))
            .map(str::to_string)
            .collect();
        Self {
            path: path.into(),
            lines,
        }
    }

    /// Format a violation at zero-based line `idx`
    pub fn violation(&self, idx: usize, kind: &str) -> String {
        format!(
            "{}:{} - {}: {}",
            self.path.display(),
            idx + 1,
            kind,
            self.lines[idx].trim()
        )
    }
}

/// Kind of function enclosing a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enclosing {
    /// Inside an `async fn`
    AsyncFn,
    /// Inside a plain `fn`
    SyncFn,
    /// Not inside any function (module level)
    Module,
}

/// Workspace root, two levels above this package
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// All production sources under a workspace-relative directory
pub fn production_sources(rel_dir: &str) -> Vec<SourceFile> {
    let dir = workspace_root().join(rel_dir);
    if !dir.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(&dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|entry| {
            let source = fs::read_to_string(entry.path()).ok()?;
            Some(SourceFile::from_source(entry.path(), &source))
        })
        .collect()
}

/// The line with comments stripped
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Find the function that encloses line `idx`
pub fn enclosing_fn(lines: &[String], idx: usize) -> Enclosing {
    for line in lines[..=idx].iter().rev() {
        let decl = strip_visibility(code_part(line).trim_start());
        if decl.starts_with("async fn ") {
            return Enclosing::AsyncFn;
        }
        if decl.starts_with("fn ") {
            return Enclosing::SyncFn;
        }
    }
    Enclosing::Module
}

/// Whether `code` invokes the macro `name` (e.g. `println!`) as a whole token
pub fn invokes_macro(code: &str, name: &str) -> bool {
    code.match_indices(name).any(|(pos, _)| {
        let before = code[..pos].chars().next_back();
        let after = code[pos + name.len()..].chars().next();
        !before.is_some_and(|c| c.is_alphanumeric() || c == '_')
            && matches!(after, Some('(' | '[' | '{'))
    })
}

fn strip_visibility(line: &str) -> &str {
    for prefix in ["pub(crate) ", "pub(super) ", "pub "] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return rest;
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_async_function_detection() {
        let code = lines(&[
            "pub async fn bad_function() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ]);
        assert_eq!(enclosing_fn(&code, 1), Enclosing::AsyncFn);
    }

    #[test]
    fn test_sync_function_detection() {
        let code = lines(&[
            "async fn earlier() {}",
            "pub(crate) fn load() {",
            "    let contents = std::fs::read_to_string(\"config.toml\")?;",
            "}",
        ]);
        assert_eq!(enclosing_fn(&code, 2), Enclosing::SyncFn);
        assert_eq!(enclosing_fn(&lines(&["use std::fs;"]), 0), Enclosing::Module);
    }

    #[test]
    fn test_test_section_is_dropped() {
        let file = SourceFile::from_source(
            "x.rs",
            "fn prod() {}\n\n#[cfg(test)]\nmod tests {\n    fn t() { std::thread::sleep(d); }\n}\n",
        );
        assert_eq!(file.lines.len(), 2);
    }

    #[test]
    fn test_macro_token_matching() {
        assert!(invokes_macro("    println!(\"x\");", "println!"));
        assert!(!invokes_macro("    eprintln!(\"x\");", "println!"));
        assert!(!invokes_macro("    eprint!(\"x\");", "print!"));
        assert!(!invokes_macro("let s = \"print!\";", "print!"));
    }

    #[test]
    fn test_comments_are_ignored() {
        assert_eq!(code_part("    // std::fs::read"), "    ");
        assert_eq!(code_part("/// println!(\"doc\")"), "");
    }
}
