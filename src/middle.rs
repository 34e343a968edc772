// The middle layer: owns the project state, the step clock and the audio gate.
// The TUI feeds it InputEvents and elapsed time and reads back a DisplayState.

use std::time::Instant;

use crate::audio::{SampleBuffer, SampleId};
use crate::audio_api::{AudioCommand, AudioOut, BassNoteParams, TriggerParams};
use crate::pipeline::bassline::BASE_MIDI_NOTE;
use crate::pipeline::clock::{StepClock, Tick};
use crate::pipeline::project::ProjectState;
use crate::pipeline::scheduler::{bass_tick, drum_tick, StepProgram};
use crate::pipeline::tempo::sixteenth_secs;
use crate::pipeline::Rebuild;
use crate::shared::{BassStepView, DisplayState, InputEvent, TrackView};

pub struct Middle<A: AudioOut> {
    pub state: ProjectState,
    audio: A,
    clock: StepClock,
    program: StepProgram,
    playing: bool,
    pending: Vec<AudioCommand>, // sample registrations held until audio is up
}

impl<A: AudioOut> Middle<A> {
    pub fn new(state: ProjectState, audio: A, lookahead: f64) -> Self {
        let program = StepProgram::capture(&state);
        Self {
            state,
            audio,
            clock: StepClock::new(lookahead),
            program,
            playing: false,
            pending: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Hook a decoded sample up to a drum track. The buffer reaches the engine on the
    /// first audio start, or right away if audio is already running.
    pub fn attach_sample(&mut self, track: usize, id: SampleId, buffer: SampleBuffer) {
        if self.state.drums.attach_sample(track, id) == Rebuild::None {
            log::warn!("no drum track {track} to attach {id} to");
            return;
        }
        let cmd = AudioCommand::RegisterSample { id, buffer };
        if self.audio.is_started() {
            if let Err(e) = self.audio.send(cmd) {
                log::error!("could not register {id}: {e:#}");
            }
        } else {
            self.pending.push(cmd);
        }
        self.apply(Rebuild::Program);
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        self.handle_input_at(event, Instant::now());
    }

    pub fn handle_input_at(&mut self, event: InputEvent, now: Instant) {
        let rebuild = match event {
            InputEvent::PlayPress => {
                self.toggle_play();
                Rebuild::None
            }
            InputEvent::TapTempo => {
                self.state.tap_tempo(now);
                Rebuild::None
            }
            InputEvent::AdjustTempo(delta) => {
                self.state.adjust_tempo(delta);
                Rebuild::None
            }
            InputEvent::EnterTempo(text) => {
                self.state.enter_tempo(&text);
                Rebuild::None
            }
            InputEvent::AdjustSwing(delta) => {
                let swing = self.state.swing as i32 + delta as i32;
                self.state.set_swing(swing)
            }

            InputEvent::ToggleStep { track, step } => self.state.drums.toggle_step(track, step),
            InputEvent::Mute(track) => self.state.drums.toggle_mute(track),
            InputEvent::Solo { track, additive } => self.state.drums.solo(track, additive),
            InputEvent::AdjustVolume { track, delta } => match self.state.drums.tracks.get(track) {
                Some(t) => {
                    let volume = t.volume + delta;
                    self.state.drums.set_volume(track, volume)
                }
                None => Rebuild::None,
            },
            InputEvent::Audition(track) => {
                self.audition(track);
                Rebuild::None
            }
            InputEvent::ClearDrums => self.state.drums.clear(),

            InputEvent::ToggleBassNote(step) => self.state.bass.toggle_note(step),
            InputEvent::ToggleSlide(step) => self.state.bass.toggle_slide(step),
            InputEvent::SelectPitch(pitch) => {
                self.state.bass.select_pitch(pitch);
                Rebuild::None
            }
            InputEvent::SetOctave { pitch, octave } => {
                self.state.bass.set_octave(pitch, octave);
                Rebuild::None
            }
            InputEvent::TestSynth => {
                self.test_synth();
                Rebuild::None
            }
            InputEvent::ClearBass => self.state.bass.clear(),

            InputEvent::AdjustCutoff(octaves) => {
                let cutoff = self.state.bass.synth.cutoff * 2f32.powf(octaves);
                self.state.bass.set_cutoff(cutoff);
                self.push_synth_params();
                Rebuild::None
            }
            InputEvent::AdjustResonance(delta) => {
                let q = self.state.bass.synth.resonance + delta;
                self.state.bass.set_resonance(q);
                self.push_synth_params();
                Rebuild::None
            }
            InputEvent::AdjustDecay(delta) => {
                let decay = self.state.bass.synth.decay + delta;
                self.state.bass.set_decay(decay);
                self.push_synth_params();
                Rebuild::None
            }
            InputEvent::AdjustEnvelopeMod(delta) => {
                let amount = self.state.bass.envelope_mod + delta;
                self.state.bass.set_envelope_mod(amount);
                Rebuild::None
            }

            InputEvent::Quit => Rebuild::None,
        };
        self.apply(rebuild);
    }

    /// Advance the clock by `elapsed` seconds and fire whatever ticks fell inside.
    pub fn tick(&mut self, elapsed: f64) {
        self.tick_at(elapsed, Instant::now());
    }

    pub fn tick_at(&mut self, elapsed: f64, now: Instant) {
        self.state.taps.expire(now);
        if !self.playing {
            return;
        }
        for tick in self.clock.advance(elapsed, self.state.tempo) {
            self.run_tick(tick);
        }
    }

    pub fn display_state(&self) -> DisplayState {
        let tracks = self
            .state
            .drums
            .tracks
            .iter()
            .map(|t| TrackView {
                name: t.name.clone(),
                steps: t.steps.map(|s| s.active),
                volume: t.volume,
                muted: t.muted,
                solo: t.solo,
                loaded: t.sample.is_some(),
            })
            .collect();
        let bass = self
            .state
            .bass
            .steps
            .iter()
            .map(|s| BassStepView {
                label: if s.is_on() { s.label() } else { String::new() },
                on: s.is_on(),
                slide: s.slide,
            })
            .collect();

        DisplayState {
            playing: self.playing,
            playing_step: self.playing.then(|| self.clock.current_step() as u8),
            tempo: self.state.tempo,
            swing: self.state.swing,
            tracks,
            bass,
            selected_pitch: self.state.bass.selected_pitch,
            selected_octave: self.state.bass.selected_octave(),
            cutoff: self.state.bass.synth.cutoff,
            resonance: self.state.bass.synth.resonance,
            decay: self.state.bass.synth.decay,
            envelope_mod: self.state.bass.envelope_mod,
        }
    }

    // Edits never patch the running program; they swap in a fresh snapshot.
    fn apply(&mut self, rebuild: Rebuild) {
        if rebuild == Rebuild::Program && self.playing {
            self.program = StepProgram::capture(&self.state);
            log::debug!("rebuilt step program at step {}", self.clock.current_step());
        }
    }

    fn run_tick(&mut self, tick: Tick) {
        let tempo = self.state.tempo;
        for hit in drum_tick(&self.program, tick, tempo) {
            let name = &self.program.tracks[hit.track].name;
            for sample_id in hit.chokes {
                let stop = AudioCommand::Stop {
                    sample_id,
                    offset: hit.trigger.offset,
                };
                if let Err(e) = self.audio.send(stop) {
                    log::warn!("could not choke {sample_id} for {name}: {e:#}");
                }
            }
            match self.audio.send(AudioCommand::Trigger(hit.trigger)) {
                Ok(()) => log::debug!("playing {name} at step {}", tick.step),
                Err(e) => log::error!("error playing {name} at step {}: {e:#}", tick.step),
            }
        }

        if let Some(note) = bass_tick(&self.program, tick, tempo) {
            if let Err(e) = self.audio.send(AudioCommand::BassNote(note)) {
                log::error!("error playing bass at step {}: {e:#}", tick.step);
            }
        }
    }

    fn toggle_play(&mut self) {
        if self.playing {
            self.playing = false;
            self.clock.stop();
            if let Err(e) = self.audio.send(AudioCommand::StopAll) {
                log::error!("error stopping playback: {e:#}");
            }
            log::info!("transport stopped");
            return;
        }

        if let Err(e) = self.ensure_audio() {
            log::error!("error starting playback: {e:#}");
            self.playing = false;
            self.clock.stop();
            return;
        }
        self.program = StepProgram::capture(&self.state);
        self.clock.start();
        self.playing = true;
        log::info!("transport started at {} bpm", self.state.tempo);
    }

    /// One-time audio bring-up; a no-op once the backend is running.
    fn ensure_audio(&mut self) -> anyhow::Result<()> {
        if self.audio.is_started() {
            return Ok(());
        }
        self.audio.start()?;
        for cmd in std::mem::take(&mut self.pending) {
            if let Err(e) = self.audio.send(cmd) {
                log::error!("could not register sample: {e:#}");
            }
        }
        self.push_synth_params();
        Ok(())
    }

    fn push_synth_params(&mut self) {
        if !self.audio.is_started() {
            return;
        }
        if let Err(e) = self.audio.send(AudioCommand::SetSynth(self.state.bass.synth)) {
            log::warn!("could not update synth: {e:#}");
        }
    }

    fn audition(&mut self, track: usize) {
        let Some(t) = self.state.drums.tracks.get(track) else {
            return;
        };
        let Some(sample_id) = t.sample else {
            log::info!("{} has no sample loaded", t.name);
            return;
        };
        let (name, gain) = (t.name.clone(), t.volume);
        if let Err(e) = self.ensure_audio() {
            log::error!("audio unavailable: {e:#}");
            return;
        }
        let cmd = AudioCommand::Trigger(TriggerParams {
            sample_id,
            gain,
            offset: 0.0,
        });
        if let Err(e) = self.audio.send(cmd) {
            log::error!("error auditioning {name}: {e:#}");
        }
    }

    // C2 for an eighth note with the current voice settings
    fn test_synth(&mut self) {
        if let Err(e) = self.ensure_audio() {
            log::error!("audio unavailable: {e:#}");
            return;
        }
        let note = AudioCommand::BassNote(BassNoteParams {
            midi: BASE_MIDI_NOTE,
            velocity: 1.0,
            duration: 2.0 * sixteenth_secs(self.state.tempo),
            portamento: 0.0,
            offset: 0.0,
        });
        if let Err(e) = self.audio.send(note) {
            log::error!("error playing test note: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::StereoFrame;
    use crate::shared::{MAX_TEMPO, MIN_TEMPO, STEPS_PER_PATTERN};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeAudio {
        started: bool,
        fail_start: bool,
        start_calls: usize,
        broken: Vec<SampleId>, // triggers of these fail
        sent: Vec<AudioCommand>,
    }

    impl AudioOut for FakeAudio {
        fn start(&mut self) -> anyhow::Result<()> {
            self.start_calls += 1;
            if self.fail_start {
                anyhow::bail!("no device");
            }
            self.started = true;
            Ok(())
        }

        fn is_started(&self) -> bool {
            self.started
        }

        fn send(&mut self, cmd: AudioCommand) -> anyhow::Result<()> {
            if !self.started {
                anyhow::bail!("not started");
            }
            if let AudioCommand::Trigger(t) = &cmd {
                if self.broken.contains(&t.sample_id) {
                    anyhow::bail!("voice blew up");
                }
            }
            self.sent.push(cmd);
            Ok(())
        }
    }

    const K: usize = 0;
    const C: usize = 1;
    const H: usize = 2;
    const OH: usize = 3;

    fn sid(track: usize) -> SampleId {
        SampleId(500 + track as u32)
    }

    fn buffer() -> SampleBuffer {
        SampleBuffer {
            data: vec![StereoFrame::zero(); 4],
            sample_rate: 44100,
        }
    }

    fn middle_with(audio: FakeAudio) -> Middle<FakeAudio> {
        let mut m = Middle::new(ProjectState::default(), audio, 0.05);
        for track in 0..4 {
            m.attach_sample(track, sid(track), buffer());
        }
        m
    }

    fn middle() -> Middle<FakeAudio> {
        middle_with(FakeAudio::default())
    }

    fn triggered(m: &Middle<FakeAudio>) -> Vec<SampleId> {
        m.audio
            .sent
            .iter()
            .filter_map(|c| match c {
                AudioCommand::Trigger(t) => Some(t.sample_id),
                _ => None,
            })
            .collect()
    }

    fn play(m: &mut Middle<FakeAudio>) {
        m.handle_input(InputEvent::PlayPress);
        m.audio.sent.clear();
    }

    #[test]
    fn first_play_starts_audio_and_flushes_samples() {
        let mut m = middle();
        assert!(!m.audio.started);
        m.handle_input(InputEvent::PlayPress);

        assert!(m.is_playing());
        let registered = m
            .audio
            .sent
            .iter()
            .filter(|c| matches!(c, AudioCommand::RegisterSample { .. }))
            .count();
        assert_eq!(registered, 4);
        assert!(m.audio.sent.iter().any(|c| matches!(c, AudioCommand::SetSynth(_))));
    }

    #[test]
    fn audio_starts_only_once() {
        let mut m = middle();
        for _ in 0..3 {
            m.handle_input(InputEvent::PlayPress);
            m.handle_input(InputEvent::PlayPress);
        }
        assert_eq!(m.audio.start_calls, 1);
    }

    #[test]
    fn failed_start_leaves_transport_stopped() {
        let mut m = middle_with(FakeAudio {
            fail_start: true,
            ..Default::default()
        });
        m.handle_input(InputEvent::PlayPress);

        assert!(!m.is_playing());
        let ds = m.display_state();
        assert!(!ds.playing);
        assert_eq!(ds.playing_step, None);
    }

    #[test]
    fn step_zero_fires_on_play() {
        let mut m = middle();
        m.handle_input(InputEvent::ToggleStep { track: K, step: 0 });
        play(&mut m);
        m.tick(0.0);
        assert_eq!(triggered(&m), [sid(K)]);
    }

    #[test]
    fn a_full_bar_plays_every_active_step_once() {
        let mut m = middle();
        for step in [0, 4, 8, 12] {
            m.handle_input(InputEvent::ToggleStep { track: K, step });
        }
        play(&mut m);
        m.tick(0.0);
        for _ in 0..15 {
            m.tick(0.125);
        }
        assert_eq!(triggered(&m).len(), 4);
    }

    #[test]
    fn choke_stop_is_sent_before_trigger() {
        let mut m = middle();
        m.handle_input(InputEvent::ToggleStep { track: H, step: 0 });
        play(&mut m);
        m.tick(0.0);

        match m.audio.sent.as_slice() {
            [AudioCommand::Stop { sample_id, .. }, AudioCommand::Trigger(t)] => {
                assert_eq!(*sample_id, sid(OH));
                assert_eq!(t.sample_id, sid(H));
            }
            other => panic!("unexpected commands {other:?}"),
        }
    }

    #[test]
    fn one_broken_track_does_not_stop_the_rest() {
        let mut m = middle_with(FakeAudio {
            broken: vec![sid(K)],
            ..Default::default()
        });
        m.handle_input(InputEvent::ToggleStep { track: K, step: 0 });
        m.handle_input(InputEvent::ToggleStep { track: C, step: 0 });
        play(&mut m);
        m.tick(0.0);
        assert_eq!(triggered(&m), [sid(C)]);
    }

    #[test]
    fn edits_while_playing_reach_the_next_tick() {
        let mut m = middle();
        play(&mut m);
        m.tick(0.0);
        m.handle_input(InputEvent::ToggleStep { track: C, step: 1 });
        m.tick(0.125);
        assert_eq!(triggered(&m), [sid(C)]);

        m.handle_input(InputEvent::Mute(C));
        m.handle_input(InputEvent::ToggleStep { track: C, step: 2 });
        m.tick(0.125);
        assert_eq!(triggered(&m).len(), 1);
    }

    #[test]
    fn rebuild_keeps_the_playhead() {
        let mut m = middle();
        play(&mut m);
        m.tick(0.0);
        m.tick(0.3);
        m.handle_input(InputEvent::ToggleStep { track: K, step: 5 });
        assert_eq!(m.display_state().playing_step, Some(2));
    }

    #[test]
    fn solo_silences_everything_else() {
        let mut m = middle();
        for track in 0..4 {
            m.handle_input(InputEvent::ToggleStep { track, step: 0 });
        }
        m.handle_input(InputEvent::Mute(C));
        m.handle_input(InputEvent::Solo { track: C, additive: false });
        play(&mut m);
        m.tick(0.0);
        assert_eq!(triggered(&m), [sid(C)]);
    }

    #[test]
    fn swing_pushes_odd_steps_late() {
        let mut m = middle();
        m.handle_input(InputEvent::AdjustSwing(40));
        m.handle_input(InputEvent::ToggleStep { track: K, step: 0 });
        m.handle_input(InputEvent::ToggleStep { track: K, step: 1 });
        play(&mut m);
        m.tick(0.0);
        m.tick(0.125);

        let offsets: Vec<f64> = m
            .audio
            .sent
            .iter()
            .filter_map(|c| match c {
                AudioCommand::Trigger(t) => Some(t.offset),
                _ => None,
            })
            .collect();
        assert_eq!(offsets.len(), 2);
        assert!((offsets[1] - offsets[0] - 0.4 * 0.125).abs() < 1e-9);
    }

    #[test]
    fn stop_silences_and_resets() {
        let mut m = middle();
        play(&mut m);
        m.tick(0.0);
        m.tick(0.3);
        m.handle_input(InputEvent::PlayPress);

        assert!(!m.is_playing());
        assert!(matches!(m.audio.sent.last(), Some(AudioCommand::StopAll)));
        m.audio.sent.clear();
        m.tick(1.0);
        assert!(m.audio.sent.is_empty());

        m.handle_input(InputEvent::PlayPress);
        assert_eq!(m.display_state().playing_step, Some(0));
    }

    #[test]
    fn bass_lane_plays_notes_and_skips_silent_steps() {
        let mut m = middle();
        m.handle_input(InputEvent::SelectPitch(2));
        m.handle_input(InputEvent::ToggleBassNote(0));
        m.handle_input(InputEvent::ToggleSlide(1)); // slide alone never sounds
        play(&mut m);
        m.tick(0.0);
        m.tick(0.125);

        let notes: Vec<&BassNoteParams> = m
            .audio
            .sent
            .iter()
            .filter_map(|c| match c {
                AudioCommand::BassNote(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].midi, 38);
    }

    #[test]
    fn tempo_events_stay_in_range() {
        let mut m = middle();
        m.handle_input(InputEvent::AdjustTempo(1000));
        assert_eq!(m.state.tempo, MAX_TEMPO);
        m.handle_input(InputEvent::EnterTempo("12".into()));
        assert_eq!(m.state.tempo, MIN_TEMPO);
        m.handle_input(InputEvent::EnterTempo("x".into()));
        assert_eq!(m.state.tempo, MIN_TEMPO);

        let t0 = Instant::now();
        for i in 0..4 {
            m.handle_input_at(InputEvent::TapTempo, t0 + Duration::from_millis(500 * i));
        }
        assert_eq!(m.state.tempo, 120);
    }

    #[test]
    fn idle_ticks_expire_tap_history() {
        let mut m = middle();
        let t0 = Instant::now();
        m.handle_input_at(InputEvent::TapTempo, t0);
        m.tick_at(0.016, t0 + Duration::from_secs(3));
        assert_eq!(m.state.taps.pending(), 0);
    }

    #[test]
    fn clear_keeps_tempo_swing_and_volume() {
        let mut m = middle();
        m.handle_input(InputEvent::AdjustTempo(10));
        m.handle_input(InputEvent::AdjustSwing(15));
        m.handle_input(InputEvent::AdjustVolume { track: K, delta: -0.5 });
        m.handle_input(InputEvent::ToggleStep { track: K, step: 3 });
        m.handle_input(InputEvent::ToggleBassNote(3));
        m.handle_input(InputEvent::ClearDrums);
        m.handle_input(InputEvent::ClearBass);

        let ds = m.display_state();
        assert_eq!(ds.tempo, 130);
        assert_eq!(ds.swing, 15);
        assert!((ds.tracks[K].volume - 0.5).abs() < 1e-6);
        assert!(ds.tracks.iter().all(|t| t.steps.iter().all(|s| !s)));
        assert!(ds.bass.iter().all(|s| !s.on));
    }

    #[test]
    fn synth_knobs_are_pushed_once_audio_runs() {
        let mut m = middle();
        m.handle_input(InputEvent::AdjustCutoff(1.0));
        assert!(m.audio.sent.is_empty());
        assert_eq!(m.state.bass.synth.cutoff, 2000.0);

        play(&mut m);
        m.handle_input(InputEvent::AdjustResonance(2.0));
        match m.audio.sent.last() {
            Some(AudioCommand::SetSynth(p)) => {
                assert_eq!(p.cutoff, 2000.0);
                assert_eq!(p.resonance, 2.0);
            }
            other => panic!("expected synth update, got {other:?}"),
        }
    }

    #[test]
    fn audition_plays_immediately() {
        let mut m = middle();
        m.handle_input(InputEvent::Audition(OH));
        assert!(m.audio.started);
        match m.audio.sent.last() {
            Some(AudioCommand::Trigger(t)) => {
                assert_eq!(t.sample_id, sid(OH));
                assert_eq!(t.offset, 0.0);
            }
            other => panic!("expected trigger, got {other:?}"),
        }
    }

    #[test]
    fn unloaded_track_neither_auditions_nor_plays() {
        let mut m = Middle::new(ProjectState::default(), FakeAudio::default(), 0.05);
        m.handle_input(InputEvent::Audition(K));
        assert!(!m.audio.started);

        m.handle_input(InputEvent::ToggleStep { track: K, step: 0 });
        m.handle_input(InputEvent::PlayPress);
        m.tick(0.0);
        assert!(triggered(&m).is_empty());
    }

    #[test]
    fn display_shows_bass_labels_and_playhead() {
        let mut m = middle();
        m.handle_input(InputEvent::SelectPitch(9));
        m.handle_input(InputEvent::SetOctave { pitch: 9, octave: 3 });
        m.handle_input(InputEvent::ToggleBassNote(7));
        let ds = m.display_state();
        assert_eq!(ds.bass[7].label, "A3");
        assert_eq!(ds.selected_octave, 3);
        assert_eq!(ds.bass.len(), STEPS_PER_PATTERN);
        assert_eq!(ds.playing_step, None);
    }
}
