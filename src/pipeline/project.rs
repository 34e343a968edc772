// Everything the session knows about, in one place for middle.rs to mutate.
//
// "track": one drum voice (K, C, H, OH) with its sixteen steps and mixer flags.
// "bassline": the monophonic synth lane plus its pitch selector and voice settings.
// Nothing here outlives the process.

use super::bassline::Bassline;
use super::drums::DrumKit;
use super::tempo::{clamp_swing, clamp_tempo, parse_tempo, TapTempo};
use super::Rebuild;

#[derive(Clone, Debug)]
pub struct ProjectState {
    pub drums: DrumKit,
    pub bass: Bassline,
    pub tempo: u16,
    pub swing: u8, // percent of a sixteenth that odd drum steps are delayed
    pub taps: TapTempo,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::new(120, 0)
    }
}

impl ProjectState {
    pub fn new(tempo: u16, swing: u8) -> Self {
        Self {
            drums: DrumKit::default(),
            bass: Bassline::default(),
            tempo: clamp_tempo(tempo as i32),
            swing: clamp_swing(swing as i32),
            taps: TapTempo::default(),
        }
    }

    // Tempo is read live by the clock, so none of these ask for a rebuild

    pub fn adjust_tempo(&mut self, delta: i16) {
        self.tempo = clamp_tempo(self.tempo as i32 + delta as i32);
    }

    pub fn enter_tempo(&mut self, text: &str) {
        if let Some(bpm) = parse_tempo(text) {
            self.tempo = bpm;
        }
    }

    pub fn tap_tempo(&mut self, now: std::time::Instant) {
        if let Some(bpm) = self.taps.tap(now) {
            self.tempo = bpm;
        }
    }

    pub fn set_swing(&mut self, percent: i32) -> Rebuild {
        let swing = clamp_swing(percent);
        if swing == self.swing {
            return Rebuild::None;
        }
        self.swing = swing;
        Rebuild::Program
    }
}
