//! Terminal output: prefixed log lines, `✓`/`✗`/`⚠` status lines and an
//! in-place progress line.
//!
//! ```ignore
//! log!("variants"; "encoding {} images", count);
//! debug!("fallback"; "{} -> {}", src, format);
//! ```

use crossterm::{
    cursor, queue,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{StdoutLock, Write, stdout},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Progress lines currently drawn; log lines must replace them instead of
/// appending to them.
static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// `log!("module"; "format {}", args)` prints `[module] format args`.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Like [`log!`], printed only with `--verbose`.
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

pub fn log(module: &str, message: &str) {
    let mut out = stdout().lock();
    if BAR_COUNT.load(Ordering::SeqCst) > 0 {
        clear_line(&mut out);
    } else {
        queue!(out, Clear(ClearType::UntilNewLine)).ok();
    }
    writeln!(out, "{} {message}", colorize_prefix(module)).ok();
    out.flush().ok();
}

fn clear_line(out: &mut StdoutLock<'_>) {
    queue!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
}

fn colorize_prefix(module: &str) -> String {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "serve" => prefix.bright_blue().bold().to_string(),
        "cache" => prefix.bright_cyan().bold().to_string(),
        "preload" | "fallback" => prefix.bright_magenta().bold().to_string(),
        "variants" | "rewrite" | "check" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Status lines
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Success,
    Error,
    Warning,
}

impl Status {
    fn symbol(self) -> String {
        match self {
            Self::Success => "✓".green().to_string(),
            Self::Error => "✗".red().to_string(),
            Self::Warning => "⚠".yellow().to_string(),
        }
    }
}

fn status_line(status: Status, message: &str) -> String {
    format!("{} {}", status.symbol(), message)
}

fn print_status(status: Status, message: &str) {
    let mut stdout = stdout().lock();
    writeln!(stdout, "{}", status_line(status, message)).ok();
    stdout.flush().ok();
}

/// `✓ message`
pub fn status_success(message: &str) {
    print_status(Status::Success, message);
}

/// `✗ summary`, followed by `detail` on the next lines when non-empty.
pub fn status_error(summary: &str, detail: &str) {
    if detail.is_empty() {
        print_status(Status::Error, summary);
    } else {
        print_status(Status::Error, &format!("{summary}\n{detail}"));
    }
}

/// `⚠ message`
pub fn status_warning(message: &str) {
    print_status(Status::Warning, message);
}

// ============================================================================
// Progress line
// ============================================================================

/// Counters redrawn in place on one line: `[variants] avif(42/69) webp(40/69)`.
///
/// Worker threads call [`inc`](Self::inc) freely; a redraw is skipped when
/// another thread is drawing.
pub struct ProgressLine {
    module: &'static str,
    counters: Vec<Counter>,
    lock: Mutex<()>,
}

struct Counter {
    name: &'static str,
    total: usize,
    current: AtomicUsize,
}

impl ProgressLine {
    /// Counters with a zero total are left out.
    pub fn new(module: &'static str, items: &[(&'static str, usize)]) -> Self {
        let counters = items
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|&(name, total)| Counter {
                name,
                total,
                current: AtomicUsize::new(0),
            })
            .collect();

        BAR_COUNT.store(1, Ordering::SeqCst);
        let progress = Self {
            module,
            counters,
            lock: Mutex::new(()),
        };
        progress.draw(false);
        progress
    }

    pub fn inc(&self, name: &str) {
        let Some(counter) = self.counters.iter().find(|c| c.name == name) else {
            return;
        };
        counter.current.fetch_add(1, Ordering::Relaxed);
        if let Some(_guard) = self.lock.try_lock() {
            self.draw(false);
        }
    }

    fn line(&self) -> String {
        let parts: Vec<String> = self
            .counters
            .iter()
            .map(|c| format!("{}({}/{})", c.name, c.current.load(Ordering::Relaxed), c.total))
            .collect();
        parts.join(" ")
    }

    fn draw(&self, newline: bool) {
        let mut out = stdout().lock();
        clear_line(&mut out);
        write!(out, "{} {}", colorize_prefix(self.module), self.line()).ok();
        if newline {
            writeln!(out).ok();
        }
        out.flush().ok();
    }

    /// Leave the final counts on screen.
    pub fn finish(self) {
        BAR_COUNT.store(0, Ordering::SeqCst);
        {
            let _guard = self.lock.lock();
            self.draw(true);
        }
        // Drop would erase the line just printed.
        std::mem::forget(self);
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        BAR_COUNT.store(0, Ordering::SeqCst);
        let mut out = stdout().lock();
        clear_line(&mut out);
        out.flush().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_keeps_detail_lines() {
        let line = status_line(Status::Error, "failed: index.html\n  /a.jpg exhausted");
        assert!(line.ends_with("failed: index.html\n  /a.jpg exhausted"));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_prefix_contains_module() {
        assert!(colorize_prefix("cache").contains("[cache]"));
        assert!(colorize_prefix("Serve").contains("[Serve]"));
    }

    #[test]
    fn test_progress_line_skips_empty_counters() {
        let progress = ProgressLine::new("variants", &[("avif", 2), ("webp", 0)]);
        progress.inc("avif");
        progress.inc("webp");
        assert_eq!(progress.line(), "avif(1/2)");
        drop(progress);
    }
}
