use std::time::{Duration, Instant};

use crate::shared::{MAX_SWING, MAX_TEMPO, MIN_TEMPO};

const TAP_HISTORY: usize = 4;
const TAP_TIMEOUT: Duration = Duration::from_secs(2);

pub fn clamp_tempo(bpm: i32) -> u16 {
    bpm.clamp(MIN_TEMPO as i32, MAX_TEMPO as i32) as u16
}

pub fn clamp_swing(percent: i32) -> u8 {
    percent.clamp(0, MAX_SWING as i32) as u8
}

/// Tempo typed into the numeric field. Anything that isn't a number is ignored.
pub fn parse_tempo(text: &str) -> Option<u16> {
    text.trim().parse::<i32>().ok().map(clamp_tempo)
}

/// Length of one sixteenth note in seconds.
pub fn sixteenth_secs(tempo: u16) -> f64 {
    60.0 / tempo.max(1) as f64 / 4.0
}

/// Rolling window of the last few taps.
#[derive(Clone, Debug, Default)]
pub struct TapTempo {
    taps: Vec<Instant>,
}

impl TapTempo {
    /// Register a tap. Returns a tempo once two or more taps are on record and the
    /// result lands inside the tempo range.
    pub fn tap(&mut self, now: Instant) -> Option<u16> {
        self.expire(now);
        self.taps.push(now);
        if self.taps.len() > TAP_HISTORY {
            self.taps.remove(0);
        }
        if self.taps.len() < 2 {
            return None;
        }

        let span = self.taps[self.taps.len() - 1].duration_since(self.taps[0]);
        let mean_ms = span.as_secs_f64() * 1000.0 / (self.taps.len() - 1) as f64;
        if mean_ms <= 0.0 {
            return None;
        }
        let bpm = (60_000.0 / mean_ms).round();
        if bpm >= MIN_TEMPO as f64 && bpm <= MAX_TEMPO as f64 {
            Some(bpm as u16)
        } else {
            None
        }
    }

    /// Forget the taps once the user has been idle long enough.
    pub fn expire(&mut self, now: Instant) {
        if self
            .taps
            .last()
            .is_some_and(|last| now.duration_since(*last) >= TAP_TIMEOUT)
        {
            self.taps.clear();
        }
    }

    pub fn pending(&self) -> usize {
        self.taps.len()
    }
}
