use crate::audio_api::SynthParams;
use crate::shared::{NUM_PITCHES, PITCH_NAMES, STEPS_PER_PATTERN};

use super::Rebuild;

pub const BASE_MIDI_NOTE: u8 = 36; // C2
pub const DEFAULT_VELOCITY: f32 = 0.7;
pub const DEFAULT_OCTAVE: u8 = 2;
pub const MIN_OCTAVE: u8 = 1;
pub const MAX_OCTAVE: u8 = 4;

pub const CUTOFF_RANGE: (f32, f32) = (20.0, 20000.0);
pub const RESONANCE_RANGE: (f32, f32) = (0.0, 20.0);
pub const DECAY_RANGE: (f32, f32) = (0.1, 1.0);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BassStep {
    pub note: u8, // pitch class, 0 = C
    pub velocity: f32, // 0 = step off
    pub slide: bool,
    pub octave: u8,
}

impl Default for BassStep {
    fn default() -> Self {
        Self {
            note: 0,
            velocity: 0.0,
            slide: false,
            octave: DEFAULT_OCTAVE,
        }
    }
}

impl BassStep {
    pub fn is_on(&self) -> bool {
        self.velocity > 0.0
    }

    /// Playback pitch. The octave is shown in the grid but not folded in here;
    /// every note sounds in the C2 octave.
    pub fn midi_note(&self) -> u8 {
        BASE_MIDI_NOTE + self.note
    }

    pub fn label(&self) -> String {
        format!("{}{}", PITCH_NAMES[self.note as usize % NUM_PITCHES], self.octave)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bassline {
    pub steps: [BassStep; STEPS_PER_PATTERN],
    pub selected_pitch: Option<usize>,
    pub octaves: [Option<u8>; NUM_PITCHES], // octave picked per pitch class, unset = 2
    pub synth: SynthParams,
    pub envelope_mod: f32, // shown on the panel, the voice doesn't use it
}

impl Default for Bassline {
    fn default() -> Self {
        Self {
            steps: [BassStep::default(); STEPS_PER_PATTERN],
            selected_pitch: None,
            octaves: [None; NUM_PITCHES],
            synth: SynthParams::default(),
            envelope_mod: 0.5,
        }
    }
}

impl Bassline {
    pub fn selected_octave(&self) -> u8 {
        self.octaves[self.selected_pitch.unwrap_or(0)].unwrap_or(DEFAULT_OCTAVE)
    }

    /// A sounding step turns off; a silent one turns on with the selected pitch and octave.
    pub fn toggle_note(&mut self, step: usize) -> Rebuild {
        let pitch = self.selected_pitch.unwrap_or(0);
        let octave = self.selected_octave();
        let Some(s) = self.steps.get_mut(step) else {
            return Rebuild::None;
        };
        s.note = pitch as u8;
        s.octave = octave;
        s.velocity = if s.is_on() { 0.0 } else { DEFAULT_VELOCITY };
        Rebuild::Program
    }

    pub fn toggle_slide(&mut self, step: usize) -> Rebuild {
        match self.steps.get_mut(step) {
            Some(s) => {
                s.slide = !s.slide;
                Rebuild::Program
            }
            None => Rebuild::None,
        }
    }

    pub fn select_pitch(&mut self, pitch: usize) {
        if pitch < NUM_PITCHES {
            self.selected_pitch = Some(pitch);
        }
    }

    pub fn set_octave(&mut self, pitch: usize, octave: u8) {
        if let Some(slot) = self.octaves.get_mut(pitch) {
            *slot = Some(octave.clamp(MIN_OCTAVE, MAX_OCTAVE));
        }
    }

    pub fn clear(&mut self) -> Rebuild {
        self.steps = [BassStep::default(); STEPS_PER_PATTERN];
        Rebuild::Program
    }

    pub fn set_cutoff(&mut self, hz: f32) {
        self.synth.cutoff = hz.clamp(CUTOFF_RANGE.0, CUTOFF_RANGE.1);
    }

    pub fn set_resonance(&mut self, q: f32) {
        self.synth.resonance = q.clamp(RESONANCE_RANGE.0, RESONANCE_RANGE.1);
    }

    pub fn set_decay(&mut self, secs: f32) {
        self.synth.decay = secs.clamp(DECAY_RANGE.0, DECAY_RANGE.1);
    }

    pub fn set_envelope_mod(&mut self, amount: f32) {
        self.envelope_mod = amount.clamp(0.0, 1.0);
    }
}
