//! Frame pacing: turns a monotonic clock into per-frame deltas.

use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait FrameClock {
    /// Time since an arbitrary fixed origin.
    fn now(&mut self) -> Duration;
}

/// Wall clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn now(&mut self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. With a non-zero step it advances by
/// that step after every reading, which gives fixed-rate frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    now: Duration,
    step: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fixed_step(step: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            step,
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }
}

impl FrameClock for ManualClock {
    fn now(&mut self) -> Duration {
        let now = self.now;
        self.now += self.step;
        now
    }
}

/// One scheduled frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    pub frame: u64,
    /// Seconds since the previous tick. Zero on the first tick.
    pub dt: f32,
}

/// Whether the frame loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Drives frames off a [`FrameClock`].
#[derive(Debug)]
pub struct FrameLoop<C: FrameClock> {
    clock: C,
    last: Option<Duration>,
    frame: u64,
    max_dt: Option<f32>,
}

impl<C: FrameClock> FrameLoop<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last: None,
            frame: 0,
            max_dt: None,
        }
    }

    /// Cap each delta, e.g. after the window was stalled.
    pub fn with_max_delta(mut self, max_dt: f32) -> Self {
        self.max_dt = Some(max_dt);
        self
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn tick(&mut self) -> FrameTick {
        let now = self.clock.now();
        let mut dt = self
            .last
            .map_or(0.0, |last| now.saturating_sub(last).as_secs_f32());
        if let Some(max) = self.max_dt {
            dt = dt.min(max);
        }
        self.last = Some(now);
        let tick = FrameTick {
            frame: self.frame,
            dt,
        };
        self.frame += 1;
        tick
    }

    /// Tick repeatedly until `frame` asks to exit.
    pub fn run_until(&mut self, mut frame: impl FnMut(FrameTick) -> LoopControl) {
        loop {
            let tick = self.tick();
            if frame(tick) == LoopControl::Exit {
                break;
            }
        }
    }
}
