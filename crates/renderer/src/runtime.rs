use std::time::{Duration, Instant};

/// Drawable size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Zero dimensions are raised to one so the surface stays configurable.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Fixed-step animation clock.
///
/// Each rendered frame advances time by the same delta regardless of how
/// late the callback fired, so the animation slows down on a struggling
/// device instead of skipping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepClock {
    seconds: f32,
    step: f32,
    frames: u64,
}

impl FixedStepClock {
    /// Negative or non-finite steps pause the clock.
    pub fn new(step: f32) -> Self {
        let step = if step.is_finite() { step.max(0.0) } else { 0.0 };
        Self {
            seconds: 0.0,
            step,
            frames: 0,
        }
    }

    /// Starts the clock at `seconds`, as tests and snapshots do.
    pub fn starting_at(step: f32, seconds: f32) -> Self {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        Self {
            seconds,
            ..Self::new(step)
        }
    }

    /// Time the next [`FixedStepClock::tick`] will return.
    pub fn peek(&self) -> f32 {
        self.seconds + self.step
    }

    /// Advances one frame and returns the new accumulated time.
    pub fn tick(&mut self) -> f32 {
        self.seconds += self.step;
        self.frames += 1;
        self.seconds
    }

    pub fn seconds(&self) -> f32 {
        self.seconds
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Caps the presentation rate by skipping animation callbacks that arrive
/// before the next deadline.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    next_deadline: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval,
            next_deadline: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match self.next_deadline {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_deadline
    }

    /// Records a presented frame and schedules the next deadline.
    ///
    /// When the host fell behind by more than one interval, the deadline is
    /// measured from `now` so frames do not burst to catch up.
    pub fn mark_rendered(&mut self, now: Instant) {
        let Some(interval) = self.interval else {
            self.next_deadline = None;
            return;
        };
        let base = match self.next_deadline {
            Some(previous) if now.saturating_duration_since(previous) < interval => previous,
            _ => now,
        };
        self.next_deadline = Some(base + interval);
    }

    pub fn reset(&mut self) {
        self.next_deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_advances_by_fixed_step() {
        let mut clock = FixedStepClock::new(0.016);
        clock.tick();
        clock.tick();
        let t = clock.tick();
        assert!((t - 0.048).abs() < 1e-6);
        assert_eq!(clock.frames(), 3);
    }

    #[test]
    fn clock_is_monotonic() {
        let mut clock = FixedStepClock::starting_at(0.5, 2.0);
        let mut last = clock.seconds();
        for _ in 0..100 {
            let now = clock.tick();
            assert!(now > last);
            last = now;
        }
    }

    #[test]
    fn negative_step_is_treated_as_paused() {
        let mut clock = FixedStepClock::new(-1.0);
        assert_eq!(clock.tick(), 0.0);
    }

    #[test]
    fn non_finite_inputs_never_reach_the_time_uniform() {
        let mut clock = FixedStepClock::starting_at(f32::INFINITY, f32::NAN);
        assert_eq!(clock.step(), 0.0);
        assert_eq!(clock.tick(), 0.0);
    }

    #[test]
    fn peek_does_not_advance() {
        let clock = FixedStepClock::starting_at(0.25, 1.0);
        assert_eq!(clock.peek(), 1.25);
        assert_eq!(clock.seconds(), 1.0);
        assert_eq!(clock.frames(), 0);
    }

    #[test]
    fn viewport_never_collapses_to_zero() {
        let vp = Viewport::new(0, 0);
        assert_eq!((vp.width, vp.height), (1, 1));
        assert_eq!(Viewport::new(1920, 1080).aspect(), 1920.0 / 1080.0);
    }

    #[test]
    fn scheduler_skips_early_callbacks() {
        let start = Instant::now();
        let mut scheduler = FrameScheduler::new(Some(Duration::from_millis(66)));
        assert!(scheduler.ready_for_frame(start));
        scheduler.mark_rendered(start);
        assert!(!scheduler.ready_for_frame(start + Duration::from_millis(16)));
        assert!(scheduler.ready_for_frame(start + Duration::from_millis(66)));
    }

    #[test]
    fn scheduler_keeps_cadence_when_slightly_late() {
        let start = Instant::now();
        let mut scheduler = FrameScheduler::new(Some(Duration::from_millis(100)));
        scheduler.mark_rendered(start);
        scheduler.mark_rendered(start + Duration::from_millis(110));
        assert_eq!(
            scheduler.next_deadline(),
            Some(start + Duration::from_millis(200))
        );
    }

    #[test]
    fn scheduler_resyncs_after_stall() {
        let start = Instant::now();
        let mut scheduler = FrameScheduler::new(Some(Duration::from_millis(100)));
        scheduler.mark_rendered(start);
        let late = start + Duration::from_secs(2);
        scheduler.mark_rendered(late);
        assert_eq!(
            scheduler.next_deadline(),
            Some(late + Duration::from_millis(100))
        );
    }

    #[test]
    fn uncapped_scheduler_is_always_ready() {
        let now = Instant::now();
        let mut scheduler = FrameScheduler::new(None);
        scheduler.mark_rendered(now);
        assert!(scheduler.ready_for_frame(now));
        assert_eq!(scheduler.next_deadline(), None);
    }
}
