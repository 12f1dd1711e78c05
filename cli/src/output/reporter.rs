//! `TerminalSink` — Presentation-layer implementation of `MessageSink`.
//!
//! Wraps `&OutputContext` and implements the `application::ports::MessageSink`
//! trait so the lifecycle controller can talk to the operator without
//! depending on any presentation type directly.

use owo_colors::OwoColorize as _;

use crate::application::ports::MessageSink;
use crate::output::OutputContext;

/// Terminal message sink that wraps an `OutputContext`.
///
/// - `info()` prints `"  ℹ {message}"` (suppressed when `ctx.quiet`)
/// - `warn()` prints `"  ⚠ {message}"` (suppressed when `ctx.quiet`)
/// - `error()` prints `"  ✗ {message}"` to stderr, never suppressed
///
/// In stderr mode (used with `--json`) info and warnings also go to stderr so
/// stdout stays machine-readable.
pub struct TerminalSink<'a> {
    ctx: &'a OutputContext,
    stderr_only: bool,
}

impl<'a> TerminalSink<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            stderr_only: false,
        }
    }

    #[must_use]
    pub fn stderr(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            stderr_only: true,
        }
    }

    fn emit(&self, line: &str) {
        if self.stderr_only {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
}

impl MessageSink for TerminalSink<'_> {
    fn info(&self, message: &str) {
        if !self.ctx.quiet {
            self.emit(&format!("  {} {message}", "ℹ".style(self.ctx.styles.info)));
        }
    }

    fn warn(&self, message: &str) {
        tracing::debug!(message, "operator warning");
        if !self.ctx.quiet {
            self.emit(&format!("  {} {message}", "⚠".style(self.ctx.styles.warning)));
        }
    }

    fn error(&self, message: &str) {
        eprintln!("  {} {message}", "✗".style(self.ctx.styles.error));
    }
}
