use std::time::{Duration, Instant};

use tracing::info;

const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Point-in-time view of one asset transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub written: u64,
    pub total: Option<u64>,
    /// `None` when the total size is unknown.
    pub percent: Option<f64>,
    /// Bytes per second since the previous report.
    pub bytes_per_sec: f64,
}

/// Rate-limited progress logging for a single asset.
///
/// Reports at most once per second, plus once when the advertised total is
/// reached. Purely observational.
#[derive(Debug)]
pub struct ProgressReporter {
    file_name: String,
    total: Option<u64>,
    written: u64,
    last_report: Instant,
    last_written: u64,
    finished: bool,
}

impl ProgressReporter {
    pub fn new(file_name: impl Into<String>, total: Option<u64>) -> Self {
        Self::starting_at(file_name, total, Instant::now())
    }

    fn starting_at(file_name: impl Into<String>, total: Option<u64>, now: Instant) -> Self {
        Self {
            file_name: file_name.into(),
            total: total.filter(|t| *t > 0),
            written: 0,
            last_report: now,
            last_written: 0,
            finished: false,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Account for `bytes` more and log if a report is due.
    pub fn advance(&mut self, bytes: u64) {
        if let Some(snapshot) = self.advance_at(bytes, Instant::now()) {
            self.log(&snapshot);
        }
    }

    /// Final report once the body is fully written, unless one was just emitted.
    pub fn finish(&mut self) {
        if !self.finished {
            let snapshot = self.snapshot(Instant::now());
            self.finished = true;
            self.log(&snapshot);
        }
    }

    fn advance_at(&mut self, bytes: u64, now: Instant) -> Option<ProgressSnapshot> {
        self.written = self.written.saturating_add(bytes);
        let complete = self.total == Some(self.written);
        if complete && !self.finished {
            self.finished = true;
            return Some(self.snapshot(now));
        }
        if now.duration_since(self.last_report) > REPORT_INTERVAL {
            return Some(self.snapshot(now));
        }
        None
    }

    fn snapshot(&mut self, now: Instant) -> ProgressSnapshot {
        let elapsed = now.duration_since(self.last_report).as_secs_f64();
        let delta = self.written.saturating_sub(self.last_written);
        let bytes_per_sec = if elapsed > 0.0 {
            delta as f64 / elapsed
        } else {
            0.0
        };
        self.last_report = now;
        self.last_written = self.written;

        ProgressSnapshot {
            written: self.written,
            total: self.total,
            percent: self
                .total
                .map(|total| self.written as f64 / total as f64 * 100.0),
            bytes_per_sec,
        }
    }

    fn log(&self, snapshot: &ProgressSnapshot) {
        let kib_per_sec = snapshot.bytes_per_sec / 1024.0;
        match (snapshot.total, snapshot.percent) {
            (Some(total), Some(percent)) => info!(
                file = %self.file_name,
                written = snapshot.written,
                total,
                "Downloading {}: {} / {} bytes ({:.2}%) - {:.2} KiB/s",
                self.file_name,
                snapshot.written,
                total,
                percent,
                kib_per_sec
            ),
            _ => info!(
                file = %self.file_name,
                written = snapshot.written,
                "Downloading {}: {} bytes - {:.2} KiB/s",
                self.file_name,
                snapshot.written,
                kib_per_sec
            ),
        }
    }
}
