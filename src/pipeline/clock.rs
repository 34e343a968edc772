use crate::shared::STEPS_PER_PATTERN;

use super::tempo::sixteenth_secs;

/// One sixteenth-note tick, `offset` seconds ahead of now on the audio clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub step: usize,
    pub offset: f64,
}

/// Turns the UI loop's elapsed time into sixteenth-note ticks.
///
/// Ticks are detected up to one UI frame late, so each one is pushed `lookahead`
/// seconds into the future and the lateness is subtracted again. The offset counts
/// from the moment the tick is sent; the audio side takes its queue wait back off.
///
/// A tick more than one step late (the loop stalled) is skipped rather than played
/// in a burst; the playhead still moves past it.
#[derive(Clone, Debug)]
pub struct StepClock {
    lookahead: f64,
    running: bool,
    step: usize,
    accumulator: f64, // fraction of a step elapsed since the last tick
    fired_first: bool,
}

impl StepClock {
    pub fn new(lookahead: f64) -> Self {
        Self {
            lookahead: lookahead.max(0.0),
            running: false,
            step: 0,
            accumulator: 0.0,
            fired_first: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
        self.step = 0;
        self.accumulator = 0.0;
        self.fired_first = false;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.step = 0;
        self.accumulator = 0.0;
        self.fired_first = false;
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_step(&self) -> usize {
        self.step
    }

    pub fn advance(&mut self, elapsed: f64, tempo: u16) -> Vec<Tick> {
        let mut ticks = Vec::new();
        if !self.running {
            return ticks;
        }
        if !self.fired_first {
            self.fired_first = true;
            ticks.push(Tick {
                step: self.step,
                offset: self.lookahead,
            });
        }

        let step_secs = sixteenth_secs(tempo);
        let old = self.accumulator;
        self.accumulator += elapsed.max(0.0) / step_secs;

        let mut crossed = 0.0;
        let mut skipped = 0;
        while self.accumulator >= 1.0 {
            self.accumulator -= 1.0;
            crossed += 1.0;
            self.step = (self.step + 1) % STEPS_PER_PATTERN;
            let late = elapsed - (crossed - old) * step_secs;
            if late > step_secs {
                skipped += 1;
                continue;
            }
            ticks.push(Tick {
                step: self.step,
                offset: (self.lookahead - late).max(0.0),
            });
        }
        if skipped > 0 {
            log::debug!("clock stalled, skipped {skipped} late ticks");
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_clock_is_silent() {
        let mut clock = StepClock::new(0.05);
        assert!(clock.advance(1.0, 120).is_empty());
    }

    #[test]
    fn start_fires_step_zero_right_away() {
        let mut clock = StepClock::new(0.05);
        clock.start();
        let ticks = clock.advance(0.0, 120);
        assert_eq!(ticks, vec![Tick { step: 0, offset: 0.05 }]);
        assert!(clock.advance(0.01, 120).is_empty());
    }

    #[test]
    fn ticks_land_on_the_sixteenth_grid() {
        let mut clock = StepClock::new(0.05);
        clock.start();
        clock.advance(0.0, 120);

        // 0.1s in: nothing yet. At 0.15s the step boundary (0.125s) was 25ms ago.
        assert!(clock.advance(0.1, 120).is_empty());
        let ticks = clock.advance(0.05, 120);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].step, 1);
        assert!((ticks[0].offset - 0.025).abs() < 1e-9);
    }

    #[test]
    fn steps_wrap_after_sixteen() {
        let mut clock = StepClock::new(0.0);
        clock.start();
        clock.advance(0.0, 120);
        let steps: Vec<_> = (0..16)
            .flat_map(|_| clock.advance(0.125, 120))
            .map(|t| t.step)
            .collect();
        assert_eq!(steps.len(), 16);
        assert_eq!(steps[14], 15);
        assert_eq!(steps[15], 0);
    }

    #[test]
    fn a_stall_skips_stale_ticks_instead_of_bursting() {
        let mut clock = StepClock::new(0.05);
        clock.start();
        clock.advance(0.0, 120);

        // a one second stall crosses eight steps; only the last is recent enough to play
        let ticks = clock.advance(1.01, 120);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].step, 8);
        assert!((ticks[0].offset - 0.04).abs() < 1e-9);
        assert_eq!(clock.current_step(), 8);
    }

    #[test]
    fn a_tick_less_than_a_step_late_still_plays() {
        let mut clock = StepClock::new(0.05);
        clock.start();
        clock.advance(0.0, 120);
        // boundary at 0.125, detected at 0.2: 75ms late, clamped to play now
        let ticks = clock.advance(0.2, 120);
        assert_eq!(ticks, vec![Tick { step: 1, offset: 0.0 }]);
    }

    #[test]
    fn stop_resets_playhead() {
        let mut clock = StepClock::new(0.0);
        clock.start();
        clock.advance(0.3, 120);
        assert_eq!(clock.current_step(), 2);
        clock.stop();
        assert_eq!(clock.current_step(), 0);
        assert!(!clock.is_running());
    }
}
