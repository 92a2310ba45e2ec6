// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use pagedraft_editor::StoreError;

use crate::exit_code::PatchRejected;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(writer: &mut W, format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line("error", message, io::stderr().is_terminal(), ANSI_RED);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({ "error": { "code": code, "message": message } });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Write a warning to stderr in the selected format.
pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line("warning", message, io::stderr().is_terminal(), ANSI_YELLOW);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({ "warning": { "code": code, "message": message } });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");

    for cause in error.chain() {
        if cause.downcast_ref::<PatchRejected>().is_some() {
            return ("PATCH_REJECTED", message);
        }
        if let Some(store_err) = cause.downcast_ref::<StoreError>() {
            return match store_err {
                StoreError::Conflict { current_version } => (
                    "VERSION_CONFLICT",
                    format!(
                        "The page changed on the server (now at version {current_version}). \
                         Run: pagedraft pull, then push again with --base-version {current_version}"
                    ),
                ),
                StoreError::NotFound => ("NOT_FOUND", message),
                err if err.is_transient() => (
                    "NETWORK_ERROR",
                    format!("{message}. Check that the relay is running and [store] base_url in ~/.pagedraft/config.toml"),
                ),
                _ => ("STORE_ERROR", message),
            };
        }
        if cause.downcast_ref::<serde_json::Error>().is_some() {
            return ("INVALID_JSON", message);
        }
    }

    ("ERROR", message)
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── format detection ───────────────────────────────────────────────

    #[test]
    fn detect_tty_returns_human() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
    }

    #[test]
    fn detect_pipe_returns_json() {
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
    }

    #[test]
    fn detect_json_flag_overrides_tty() {
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    // ── writers ────────────────────────────────────────────────────────

    #[test]
    fn write_output_human_format() {
        #[derive(Serialize)]
        struct Info {
            slug: String,
        }
        let info = Info { slug: "pricing".into() };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &info, |i| format!("Slug: {}", i.slug)).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Slug: pricing\n");
    }

    #[test]
    fn write_output_json_does_not_call_human_fn() {
        #[derive(Serialize)]
        struct Info {
            version: u64,
        }
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &Info { version: 4 }, |_| {
            unreachable!("human_fn should not be called in JSON mode")
        })
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["version"], 4);
    }

    #[test]
    fn render_human_error_uses_color_for_tty() {
        let line = render_human_stderr_line("error", "boom", true, ANSI_RED);
        assert!(line.contains(ANSI_RED));
        assert!(line.contains(ANSI_RESET));
    }

    #[test]
    fn render_human_warning_without_tty_is_plain() {
        assert_eq!(render_human_stderr_line("warning", "careful", false, ANSI_YELLOW), "warning: careful");
    }

    // ── actionable errors ──────────────────────────────────────────────

    #[test]
    fn conflict_suggests_pull_with_current_version() {
        let err = anyhow::Error::new(StoreError::Conflict { current_version: 7 });
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "VERSION_CONFLICT");
        assert!(message.contains("--base-version 7"));
    }

    #[test]
    fn network_failure_points_at_config() {
        let err = anyhow::Error::new(StoreError::Network("connection refused".into())).context("pull failed");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "NETWORK_ERROR");
        assert!(message.contains("base_url"));
    }

    #[test]
    fn plain_error_keeps_message() {
        let (code, message) = actionable_error(&anyhow::anyhow!("disk full"));
        assert_eq!(code, "ERROR");
        assert_eq!(message, "disk full");
    }
}
