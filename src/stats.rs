//! Rolling per-second receive statistics
//!
//! The receiver counts bytes, frames, and losses inside a one-second
//! window. On each video frame arrival the window is checked; once it has
//! elapsed a snapshot is published and every window counter resets. The
//! last snapshot is reused for overlay rendering until replaced; before
//! the first window elapses there is nothing to draw, which is fine.

use std::time::{Duration, Instant};

/// Published once per elapsed window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    /// Video frames per second over the window
    pub fps: f64,
    /// Receive bandwidth in KB/s over the window
    pub bandwidth_kbps: f64,
    /// Lost datagrams as a percentage of (received + lost), in [0, 100]
    pub loss_percent: f64,
}

/// Window counters plus the last published snapshot
#[derive(Debug)]
pub struct StatsTracker {
    window_start: Instant,
    bytes: u64,
    frames: u64,
    lost: u64,
    last: Option<StatsSnapshot>,
}

const WINDOW: Duration = Duration::from_secs(1);

impl StatsTracker {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    fn starting_at(now: Instant) -> Self {
        Self {
            window_start: now,
            bytes: 0,
            frames: 0,
            lost: 0,
            last: None,
        }
    }

    /// Count a received datagram's total size (header included)
    pub fn record_bytes(&mut self, n: usize) {
        self.bytes += n as u64;
    }

    /// Count one received video frame
    pub fn record_frame(&mut self) {
        self.frames += 1;
    }

    /// Count one lost datagram (Invalid decode)
    pub fn record_loss(&mut self) {
        self.lost += 1;
    }

    /// Recompute the snapshot if the window has elapsed
    ///
    /// Called on each video frame arrival. Returns the freshly published
    /// snapshot when one was produced this call.
    pub fn tick(&mut self) -> Option<StatsSnapshot> {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> Option<StatsSnapshot> {
        let elapsed = now.duration_since(self.window_start);
        if elapsed < WINDOW {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        // Floor the denominator at 1 so an all-silent window divides cleanly
        let denominator = (self.frames + self.lost).max(1) as f64;
        let snapshot = StatsSnapshot {
            fps: self.frames as f64 / secs,
            bandwidth_kbps: self.bytes as f64 / 1024.0 / secs,
            loss_percent: self.lost as f64 / denominator * 100.0,
        };

        self.window_start = now;
        self.bytes = 0;
        self.frames = 0;
        self.lost = 0;
        self.last = Some(snapshot);

        Some(snapshot)
    }

    /// Last published snapshot, if any window has completed yet
    pub fn snapshot(&self) -> Option<&StatsSnapshot> {
        self.last.as_ref()
    }

    /// Frames counted in the current (unfinished) window
    pub fn frames_in_window(&self) -> u64 {
        self.frames
    }

    /// Losses counted in the current (unfinished) window
    pub fn losses_in_window(&self) -> u64 {
        self.lost
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
