use crate::renderer::Clock;

/// Frame cadence: 17, 17, 16 ms, about 60 fps.
const FRAME_PATTERN: [u64; 3] = [17, 17, 16];

/// Sleeps away whatever is left of a frame budget.
///
/// The first wait after construction only records the time: the budget is
/// measured between consecutive calls.
#[derive(Debug, Default)]
pub struct Throttler {
    last_time: u64,
    armed: bool,
    phase: usize,
}

impl Throttler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `ms` have passed since the previous call.
    pub fn wait(&mut self, clock: &mut dyn Clock, ms: u64) {
        if self.armed {
            let now = clock.millis();
            let elapsed = now.saturating_sub(self.last_time);
            if elapsed < ms {
                clock.sleep(ms - elapsed);
                self.last_time = clock.millis();
            } else {
                self.last_time = now;
            }
        } else {
            self.last_time = clock.millis();
        }
        self.armed = true;
    }

    /// Wait out the next slot of the 60 fps pattern.
    pub fn frame(&mut self, clock: &mut dyn Clock) {
        let ms = FRAME_PATTERN[self.phase];
        self.phase = (self.phase + 1) % FRAME_PATTERN.len();
        self.wait(clock, ms);
    }
}
