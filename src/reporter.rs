//! Periodic status lines.
//!
//! The reporter only reads the counters; nothing it does feeds back into
//! the workers or the pool.
//!
//! ```text
//! [0:10] Executed 48211 queries (0 errors)
//! [0:20] Executed 97002 queries (3 errors)
//! ```

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};

use crate::counters::{Counters, Snapshot};
use crate::error::LoadResult;
use crate::shutdown::Shutdown;

/// How status lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `[m:s] Executed N queries (E errors)`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Body of a JSON status line.
#[derive(Debug, Serialize)]
struct ReportLine {
    elapsed_secs: u64,
    #[serde(flatten)]
    snapshot: Snapshot,
}

/// Render one status line (without the trailing newline).
pub fn format_line(elapsed: Duration, snapshot: Snapshot, format: ReportFormat) -> String {
    let secs = elapsed.as_secs();
    match format {
        ReportFormat::Text => format!(
            "[{}:{}] Executed {} queries ({} errors)",
            secs / 60,
            secs % 60,
            snapshot.executed,
            snapshot.errors
        ),
        ReportFormat::Json => serde_json::to_string(&ReportLine {
            elapsed_secs: secs,
            snapshot,
        })
        .unwrap_or_default(),
    }
}

/// Writes a counter snapshot every `interval`.
pub struct Reporter<W> {
    counters: Arc<Counters>,
    interval: Duration,
    format: ReportFormat,
    start: Instant,
    out: W,
}

impl<W: Write> Reporter<W> {
    /// Elapsed time is measured from the moment this is called, so create
    /// the reporter right after the pool is up.
    pub fn new(counters: Arc<Counters>, interval: Duration, out: W) -> Self {
        Self {
            counters,
            interval,
            format: ReportFormat::Text,
            start: Instant::now(),
            out,
        }
    }

    pub fn format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Write one line for the current totals.
    pub fn report(&mut self) -> LoadResult<()> {
        let line = format_line(self.start.elapsed(), self.counters.snapshot(), self.format);
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        Ok(())
    }

    /// Report every interval until `shutdown` fires, then hand back the
    /// writer. The first line comes one full interval after start.
    pub async fn run(mut self, mut shutdown: Shutdown) -> LoadResult<W> {
        let mut ticker = tokio::time::interval_at(self.start + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.report()?,
                _ = shutdown.wait() => break,
            }
        }

        Ok(self.out)
    }
}
