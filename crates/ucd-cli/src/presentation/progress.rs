//! Download progress rendering.
//!
//! Presentation only: draws whatever `DownloadUpdate` records the engine
//! publishes. A terminal gets an `indicatif` bar; anything else gets one
//! line per status change.

use std::fmt::Write;
use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use ucd_core::{DownloadUpdate, TaskStatus};

const MAX_LABEL: usize = 40;

/// Progress display that selects terminal or plain output.
pub struct DownloadProgress {
    inner: ProgressRender,
}

enum ProgressRender {
    Fancy(FancyProgress),
    Plain(PlainProgress),
}

impl DownloadProgress {
    /// Create a display for the file called `label`.
    pub fn new(label: &str) -> Self {
        let label = format_label(label);
        let inner = if io::stdout().is_terminal() {
            ProgressRender::Fancy(FancyProgress::new(label))
        } else {
            ProgressRender::Plain(PlainProgress::new(label))
        };
        Self { inner }
    }

    /// Draw a progress record.
    pub fn update(&mut self, update: &DownloadUpdate) {
        match &mut self.inner {
            ProgressRender::Fancy(inner) => inner.update(update),
            ProgressRender::Plain(inner) => inner.update(update),
        }
    }

    /// Reflect a non-terminal status change.
    pub fn status(&mut self, status: TaskStatus) {
        match &mut self.inner {
            ProgressRender::Fancy(inner) => inner.status(status),
            ProgressRender::Plain(inner) => inner.status(status),
        }
    }

    /// Finish and clear the display.
    pub fn finish(&mut self) {
        if let ProgressRender::Fancy(inner) = &self.inner {
            inner.bar.finish_and_clear();
        }
    }
}

struct FancyProgress {
    bar: ProgressBar,
    label: String,
    saw_length: bool,
}

impl FancyProgress {
    fn new(label: String) -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        bar.set_style(spinner_style());
        bar.set_message(format!("{label} (connecting...)"));
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            label,
            saw_length: false,
        }
    }

    fn update(&mut self, update: &DownloadUpdate) {
        match update.total_bytes {
            Some(total) if total > 0 => {
                if !self.saw_length {
                    self.bar.set_style(bar_style());
                    self.bar.set_message(self.label.clone());
                    self.saw_length = true;
                }
                if self.bar.length() != Some(total) {
                    self.bar.set_length(total);
                }
                self.bar.set_position(update.received_bytes.min(total));
            }
            _ => {
                self.bar.set_message(format!(
                    "{} {} (size unknown)",
                    self.label,
                    HumanBytes(update.received_bytes)
                ));
            }
        }
    }

    fn status(&self, status: TaskStatus) {
        match status {
            TaskStatus::Paused => self.bar.set_message(format!("{} (paused)", self.label)),
            TaskStatus::Running if self.saw_length => self.bar.set_message(self.label.clone()),
            _ => {}
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{msg} {bar:28.cyan/blue} {human_bytes:>9} / {human_total:>9} ({percent:>3}%) @ {binary_bytes_per_sec} ETA {eta}",
    )
    .map_or_else(
        |_| ProgressStyle::default_bar(),
        |style| {
            style
                .with_key("human_bytes", |state: &ProgressState, w: &mut dyn Write| {
                    let _ = write!(w, "{}", HumanBytes(state.pos()));
                })
                .with_key("human_total", |state: &ProgressState, w: &mut dyn Write| {
                    let value = state
                        .len()
                        .map_or_else(|| "?".to_string(), |len| HumanBytes(len).to_string());
                    let _ = write!(w, "{value}");
                })
        },
    )
}

/// Non-terminal output: a line per status change and per 10% step.
struct PlainProgress {
    label: String,
    last_decile: Option<u64>,
}

impl PlainProgress {
    const fn new(label: String) -> Self {
        Self {
            label,
            last_decile: None,
        }
    }

    fn update(&mut self, update: &DownloadUpdate) {
        let Some(percent) = update.percent else {
            return;
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let decile = (percent / 10.0).floor() as u64;
        if self.last_decile.is_some_and(|last| last >= decile) {
            return;
        }
        self.last_decile = Some(decile);
        println!("{}", plain_line(&self.label, update));
    }

    fn status(&self, status: TaskStatus) {
        println!("{}: {status}", self.label);
    }
}

/// One-line summary of a progress record.
pub fn plain_line(label: &str, update: &DownloadUpdate) -> String {
    let received = HumanBytes(update.received_bytes);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let speed = HumanBytes(update.speed_bps.max(0.0).round() as u64);
    match (update.total_bytes, update.percent) {
        (Some(total), Some(percent)) => format!(
            "{label}: {received} / {} ({percent:.1}%) @ {speed}/s",
            HumanBytes(total)
        ),
        _ => format!("{label}: {received} @ {speed}/s"),
    }
}

/// Shorten long file names, keeping the start.
pub fn format_label(raw: &str) -> String {
    if raw.chars().count() <= MAX_LABEL {
        return raw.to_string();
    }
    let mut buf: String = raw.chars().take(MAX_LABEL - 1).collect();
    buf.push('…');
    buf
}
