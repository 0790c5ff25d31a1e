/// Frame timer
///
/// Collects per-frame durations into a fixed-size window and reports the
/// average frame time and frame rate. The demo keeps one unbounded timer
/// for the whole run and one windowed timer for periodic reports.

use std::time::{Duration, Instant};

#[cfg(test)]
mod frame_timer_tests;

/// Moving-window frame timer
pub struct FrameTimer {
    window: usize,
    samples: Vec<Duration>,
    frame_start: Option<Instant>,
    total: Duration,
    total_frames: u64,
}

impl FrameTimer {
    /// `window` of 0 keeps no per-frame samples, only running totals
    pub fn new(window: usize) -> Self {
        Self {
            window,
            samples: Vec::with_capacity(window),
            frame_start: None,
            total: Duration::ZERO,
            total_frames: 0,
        }
    }

    /// Mark the beginning of a frame
    pub fn frame_start(&mut self) {
        self.frame_start = Some(Instant::now());
    }

    /// Mark the end of a frame and return its duration.
    ///
    /// Returns `Duration::ZERO` if no frame was started.
    pub fn frame_finish(&mut self) -> Duration {
        let Some(start) = self.frame_start.take() else {
            return Duration::ZERO;
        };
        let elapsed = start.elapsed();
        self.total += elapsed;
        self.total_frames += 1;
        if self.window > 0 {
            self.samples.push(elapsed);
        }
        elapsed
    }

    /// True once the sample window is full
    pub fn is_window_full(&self) -> bool {
        self.window > 0 && self.samples.len() >= self.window
    }

    /// Average duration over the whole run
    pub fn average(&self) -> Duration {
        if self.total_frames == 0 {
            Duration::ZERO
        } else {
            self.total / self.total_frames as u32
        }
    }

    /// Human-readable report over the current window (or the whole run if
    /// no window is kept)
    pub fn report_string(&self) -> String {
        let (sum, count) = if self.window > 0 && !self.samples.is_empty() {
            (
                self.samples.iter().sum::<Duration>(),
                self.samples.len() as u64,
            )
        } else {
            (self.total, self.total_frames)
        };
        if count == 0 {
            return "no frames recorded".to_string();
        }
        let avg = sum / count as u32;
        let avg_ms = avg.as_secs_f64() * 1000.0;
        let fps = if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 };
        format!("{:.3} ms/frame ({:.1} FPS) over {} frames", avg_ms, fps, count)
    }

    /// Clear the sample window, keeping running totals
    pub fn reset_window(&mut self) {
        self.samples.clear();
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}
