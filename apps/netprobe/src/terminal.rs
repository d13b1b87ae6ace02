//! Terminal bindings for the diagnostics engine: an `indicatif` progress bar
//! on stderr, status lines on stdout, and a hand-off message at the end.
//!
//! Everything else that writes to the terminal (status lines, log events)
//! goes through [`TerminalSurface::interrupt`] so the bar is lifted out of
//! the way first.

use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use diag_core::{Navigator, OverlaySurface, StatusSink};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

const BAR_TEMPLATE: &str = "[{bar:24}] {pos:>3}% {msg}";

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#-")
}

/// Progress overlay drawn as a single `indicatif` bar. The bar starts hidden;
/// `show` attaches it to the visible target, which stays blank when stderr
/// is not a terminal.
pub struct TerminalSurface {
    bar: ProgressBar,
    visible: AtomicBool,
    visible_target: fn() -> ProgressDrawTarget,
}

impl TerminalSurface {
    pub fn new() -> Arc<Self> {
        Self::with_target(ProgressDrawTarget::stderr)
    }

    fn with_target(visible_target: fn() -> ProgressDrawTarget) -> Arc<Self> {
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
        bar.set_style(bar_style());
        Arc::new(Self {
            bar,
            visible: AtomicBool::new(false),
            visible_target,
        })
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Lifts the bar out of the way while `print` writes, then redraws it.
    pub fn interrupt<R>(&self, print: impl FnOnce() -> R) -> R {
        self.bar.suspend(print)
    }

    /// Writer factory for `tracing_subscriber` so log events never land on
    /// the bar line.
    pub fn log_writer(&self) -> impl Fn() -> LogWriter + Send + Sync + 'static {
        let bar = self.bar.clone();
        move || LogWriter { bar: bar.clone() }
    }

    /// Clears the bar for good before the process exits.
    pub fn finish(&self) {
        self.visible.store(false, Ordering::SeqCst);
        self.bar.finish_and_clear();
    }
}

impl OverlaySurface for TerminalSurface {
    fn show(&self) {
        if !self.visible.swap(true, Ordering::SeqCst) {
            self.bar.set_draw_target((self.visible_target)());
            self.bar.tick();
        }
    }

    fn hide(&self) {
        if self.visible.swap(false, Ordering::SeqCst) {
            self.bar.set_draw_target(ProgressDrawTarget::hidden());
        }
    }

    fn set_fraction(&self, fraction: f64) {
        self.bar.set_position(fraction.clamp(0.0, 100.0).round() as u64);
    }

    fn set_text(&self, text: &str) {
        self.bar.set_message(text.to_string());
    }
}

/// Stderr writer that suspends the bar around every write.
pub struct LogWriter {
    bar: ProgressBar,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bar.suspend(|| io::stderr().lock().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().lock().flush()
    }
}

/// Writes one line and flushes. Failures are returned, never panicked on.
fn write_line(mut out: impl Write, text: &str) -> io::Result<()> {
    writeln!(out, "{text}")?;
    out.flush()
}

/// Prints every status update of one probe as its own line.
pub struct TerminalSink<O = fn() -> io::Stdout> {
    surface: Arc<TerminalSurface>,
    output: O,
}

impl TerminalSink {
    pub fn new(surface: Arc<TerminalSurface>) -> Arc<Self> {
        TerminalSink::with_output(surface, io::stdout as fn() -> io::Stdout)
    }
}

impl<O, W> TerminalSink<O>
where
    O: Fn() -> W + Send + Sync,
    W: Write,
{
    pub fn with_output(surface: Arc<TerminalSurface>, output: O) -> Arc<Self> {
        Arc::new(Self { surface, output })
    }
}

impl<O, W> StatusSink for TerminalSink<O>
where
    O: Fn() -> W + Send + Sync,
    W: Write,
{
    fn write(&self, text: &str) {
        let written = self.surface.interrupt(|| write_line((self.output)(), text));
        if let Err(err) = written {
            debug!(error = %err, "status line dropped");
        }
    }
}

pub struct TerminalNavigator {
    surface: Arc<TerminalSurface>,
}

impl TerminalNavigator {
    pub fn new(surface: Arc<TerminalSurface>) -> Self {
        Self { surface }
    }
}

#[async_trait]
impl Navigator for TerminalNavigator {
    async fn navigate(&self, destination: &str) {
        let line = format!("Results: {destination}");
        let written = self
            .surface
            .interrupt(|| write_line(io::stderr().lock(), &line));
        if let Err(err) = written {
            debug!(error = %err, "results line dropped");
        }
    }
}
