// The drum half of the project: four fixed tracks of sixteen steps.

use crate::audio::SampleId;
use crate::shared::{NUM_TRACKS, STEPS_PER_PATTERN};

use super::Rebuild;

pub const HIHAT_CHOKE: &str = "hihat";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrumStep {
    pub active: bool,
    // carried for parity with the step editor, the scheduler only reads `active`
    pub volume: f32,
    pub pan: f32,
    pub pitch: f32,
}

impl Default for DrumStep {
    fn default() -> Self {
        Self {
            active: false,
            volume: 1.0,
            pan: 0.0,
            pitch: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrumTrack {
    pub name: String,
    pub steps: [DrumStep; STEPS_PER_PATTERN],
    pub sample: Option<SampleId>,
    pub volume: f32,
    pub muted: bool,
    pub solo: bool,
    pub choke_group: Option<String>,
}

impl DrumTrack {
    pub fn new(name: &str, choke_group: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            steps: [DrumStep::default(); STEPS_PER_PATTERN],
            sample: None,
            volume: 1.0,
            muted: false,
            solo: false,
            choke_group: choke_group.map(str::to_string),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrumKit {
    pub tracks: [DrumTrack; NUM_TRACKS],
}

impl Default for DrumKit {
    fn default() -> Self {
        Self {
            tracks: [
                DrumTrack::new("K", None),
                DrumTrack::new("C", None),
                DrumTrack::new("H", Some(HIHAT_CHOKE)),
                DrumTrack::new("OH", Some(HIHAT_CHOKE)),
            ],
        }
    }
}

impl DrumKit {
    pub fn any_soloed(&self) -> bool {
        self.tracks.iter().any(|t| t.solo)
    }

    pub fn attach_sample(&mut self, track: usize, id: SampleId) -> Rebuild {
        match self.tracks.get_mut(track) {
            Some(t) => {
                t.sample = Some(id);
                Rebuild::Program
            }
            None => Rebuild::None,
        }
    }

    pub fn toggle_step(&mut self, track: usize, step: usize) -> Rebuild {
        let Some(s) = self.tracks.get_mut(track).and_then(|t| t.steps.get_mut(step)) else {
            return Rebuild::None;
        };
        s.active = !s.active;
        Rebuild::Program
    }

    pub fn toggle_mute(&mut self, track: usize) -> Rebuild {
        match self.tracks.get_mut(track) {
            Some(t) => {
                t.muted = !t.muted;
                Rebuild::Program
            }
            None => Rebuild::None,
        }
    }

    /// Plain solo makes `track` the only soloed one, or clears every solo when it already
    /// was soloed. Additive (shift) solo flips just this track.
    pub fn solo(&mut self, track: usize, additive: bool) -> Rebuild {
        let Some(current) = self.tracks.get(track).map(|t| t.solo) else {
            return Rebuild::None;
        };
        if additive {
            self.tracks[track].solo = !current;
        } else {
            for (i, t) in self.tracks.iter_mut().enumerate() {
                t.solo = !current && i == track;
            }
        }
        Rebuild::Program
    }

    /// Volume only sticks on tracks that have a sample to apply it to.
    pub fn set_volume(&mut self, track: usize, volume: f32) -> Rebuild {
        match self.tracks.get_mut(track) {
            Some(t) if t.sample.is_some() => {
                t.volume = (volume.clamp(0.0, 1.0) * 10.0).round() / 10.0;
                Rebuild::Program
            }
            _ => Rebuild::None,
        }
    }

    pub fn clear(&mut self) -> Rebuild {
        for t in self.tracks.iter_mut() {
            t.steps = [DrumStep::default(); STEPS_PER_PATTERN];
        }
        Rebuild::Program
    }
}
