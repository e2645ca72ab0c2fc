//! Tick counter, step clock and tap tempo.

use bd_ir::StepIndex;

/// Step length at power-up, in ticks.
pub const DEFAULT_STEP_LENGTH: u32 = 1000;

/// Tick counter and step position.
///
/// All timing is derived from differences of the wrapping tick counter, so
/// jitter in the control loop never shifts the step grid.
#[derive(Clone, Debug)]
pub struct Clock {
    /// Ticks since startup (wrapping)
    tick: u32,
    /// Current step
    step: StepIndex,
    /// Step at the start of this tick
    prev_step: StepIndex,
    /// Tick of the last step advance
    last_step_tick: u32,
    /// Ticks per step, never zero
    step_length: u32,
    /// Rescaled tap intervals
    taps: [u32; 2],
    /// Next history slot to write
    tap_slot: usize,
    /// Number of history entries filled (saturates at 2)
    taps_seen: u8,
    /// Tick of the previous tap
    prev_tap: u32,
    /// An external step has been seen since the clock last parked or ran
    /// internally, so the next one can measure the step period
    external_primed: bool,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_LENGTH)
    }
}

impl Clock {
    pub fn new(step_length: u32) -> Self {
        Self {
            tick: 0,
            step: StepIndex::LAST,
            prev_step: StepIndex::LAST,
            last_step_tick: 0,
            step_length: step_length.max(1),
            taps: [0; 2],
            tap_slot: 0,
            taps_seen: 0,
            prev_tap: 0,
            external_primed: false,
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn step(&self) -> StepIndex {
        self.step
    }

    pub fn step_length(&self) -> u32 {
        self.step_length
    }

    /// Count the tick and remember the step for edge detection.
    #[inline]
    pub fn begin_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.prev_step = self.step;
    }

    /// Internal clock: advance once more than `step_length` ticks have
    /// passed since the last advance.
    #[inline]
    pub fn advance_internal(&mut self) {
        self.external_primed = false;
        if self.elapsed() > self.step_length {
            self.step = self.step.next();
            self.last_step_tick = self.tick;
        }
    }

    /// External clock: advance once per received step pulse. The gap
    /// between two pulses becomes the step length, so the write index
    /// follows the external tempo.
    #[inline]
    pub fn advance_external(&mut self, pulses: u8) {
        for _ in 0..pulses {
            let elapsed = self.elapsed();
            if self.external_primed && elapsed > 0 {
                self.step_length = elapsed;
            }
            self.external_primed = true;
            self.step = self.step.next();
            self.last_step_tick = self.tick;
        }
    }

    /// Transport stopped: park on the last step so the next advance lands on 0.
    #[inline]
    pub fn park(&mut self) {
        self.step = StepIndex::LAST;
        self.last_step_tick = 0;
        self.external_primed = false;
    }

    /// Register a tap. The tempo only changes once two intervals are known.
    pub fn tap(&mut self) {
        self.taps[self.tap_slot] = self.tick.wrapping_sub(self.prev_tap) >> 2;
        self.tap_slot ^= 1;
        self.taps_seen = (self.taps_seen + 1).min(2);
        self.prev_tap = self.tick;
        if self.taps_seen == 2 {
            let avg = (self.taps[0] as u64 + self.taps[1] as u64) / 2;
            self.step_length = (avg as u32).max(1);
        }
    }

    /// Set the step length directly, floored at one tick.
    pub fn set_step_length(&mut self, ticks: u32) {
        self.step_length = ticks.max(1);
    }

    /// Ticks since the last step advance.
    #[inline]
    pub fn elapsed(&self) -> u32 {
        self.tick.wrapping_sub(self.last_step_tick)
    }

    /// Step a live hit is recorded on: the next step once three quarters
    /// of the current one have passed.
    #[inline]
    pub fn write_index(&self) -> StepIndex {
        let threshold = self.step_length - self.step_length / 4;
        if self.elapsed() >= threshold {
            self.step.next()
        } else {
            self.step
        }
    }

    /// Did the step change during this tick?
    #[inline]
    pub fn step_edge(&self) -> bool {
        self.step != self.prev_step
    }

    /// Step edge landing on a quarter-bar beat.
    #[inline]
    pub fn beat_edge(&self) -> bool {
        self.step_edge() && self.step.is_beat()
    }
}
