use std::{
    io::IsTerminal,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, LazyLock,
    },
};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use regex::Regex;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} kB ETA {eta}";

static SIZE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)L?size=\s*(\d+)\s*(?:kB|KiB)").expect("size field pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// Draw a bar when stderr is a terminal.
    #[default]
    Auto,
    Bar,
    Hidden,
}

impl ProgressMode {
    fn draws_bar(self, stderr_is_tty: bool) -> bool {
        match self {
            ProgressMode::Auto => stderr_is_tty,
            ProgressMode::Bar => true,
            ProgressMode::Hidden => false,
        }
    }
}

/// Kilobytes written by the concatenation so far, bounded by the total
/// size of the repaired fragments.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    total: u64,
    current: AtomicU64,
    finished: AtomicBool,
    bar: ProgressBar,
}

impl ProgressTracker {
    pub fn new(total_kb: u64, mode: ProgressMode) -> Self {
        let bar = if mode.draws_bar(std::io::stderr().is_terminal()) {
            let bar = ProgressBar::new(total_kb);
            bar.set_style(
                ProgressStyle::with_template(BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::with_draw_target(Some(total_kb), ProgressDrawTarget::hidden())
        };

        Self {
            inner: Arc::new(TrackerInner {
                total: total_kb,
                current: AtomicU64::new(0),
                finished: AtomicBool::new(false),
                bar,
            }),
        }
    }

    pub fn total(&self) -> u64 {
        self.inner.total
    }

    pub fn position(&self) -> u64 {
        self.inner.current.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Relaxed)
    }

    /// Record `kb` processed. Values beyond the total are clamped and the
    /// counter never moves backwards.
    pub fn set(&self, kb: u64) {
        let kb = kb.min(self.inner.total);
        let previous = self.inner.current.fetch_max(kb, Ordering::Relaxed);
        if kb > previous {
            self.inner.bar.set_position(kb);
        }
    }

    /// Jump to the total and stop drawing. Safe to call more than once.
    pub fn finish(&self) {
        self.inner
            .current
            .store(self.inner.total, Ordering::Relaxed);
        if !self.inner.finished.swap(true, Ordering::Relaxed) {
            self.inner.bar.set_position(self.inner.total);
            self.inner.bar.finish();
        }
    }
}

/// Whether `line` is one of ffmpeg's in-place status lines.
pub fn is_status_line(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("frame=") || line.starts_with("size=")
}

/// Extract the output size in kilobytes from an ffmpeg status line, e.g.
///
/// ```text
/// frame=  250 fps=0.0 q=-1.0 size=    2048kB time=00:00:10.00 bitrate=1677.7kbits/s
/// ```
///
/// Returns `None` for anything else, including status lines whose size is
/// not known yet (`size=N/A`).
pub fn parse_progress_line(line: &str) -> Option<u64> {
    if !is_status_line(line) {
        return None;
    }

    SIZE_FIELD
        .captures(line)
        .and_then(|captures| captures.get(1))
        .and_then(|size| size.as_str().parse().ok())
}
