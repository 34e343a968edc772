// The key layout, resolved by tui/input.rs into the semantic events below:
//
// Grid (4 drum rows + the bass lane, 16 steps each):
//   arrows        //  move the cursor
//   Enter / x     //  ToggleStep (drum row) or ToggleBassNote (bass lane)
//   s             //  ToggleSlide (bass lane)
//   m / o / O     //  Mute / Solo / Solo with shift (additive)
//   < / >         //  AdjustVolume on the cursor's track
//   a             //  Audition the cursor's drum sample
//
// Bass pitch selector:
//   n / N         //  SelectPitch next / previous pitch class
//   v / V         //  SetOctave up / down for the selected pitch class
//   T             //  TestSynth
//
// Transport:
//   Space         //  PlayPress
//   t             //  TapTempo
//   b             //  type a tempo, Enter commits (EnterTempo), Esc cancels
//   c / C         //  ClearDrums / ClearBass
//
// Knobs (meaning depends on the page, Tab cycles it):
//   [ / ]         //  knob A down/up
//   - / =         //  knob B down/up
//
// Quit:
//   Esc           //  Quit
//
// The middle layer owns all sequencer state; the TUI only renders the DisplayState
// it gets back every frame.

pub const NUM_TRACKS: usize = 4;
pub const STEPS_PER_PATTERN: usize = 16;
pub const NUM_PITCHES: usize = 12;

pub const MIN_TEMPO: u16 = 50;
pub const MAX_TEMPO: u16 = 200;
pub const MAX_SWING: u8 = 50;

pub const PITCH_NAMES: [&str; NUM_PITCHES] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // transport
    PlayPress,
    TapTempo,
    AdjustTempo(i16),
    EnterTempo(String), // raw text from the tempo field, parsed by the middle layer

    // drum grid
    ToggleStep { track: usize, step: usize },
    Mute(usize),
    Solo { track: usize, additive: bool },
    AdjustVolume { track: usize, delta: f32 },
    Audition(usize),
    ClearDrums,

    // bass lane
    ToggleBassNote(usize),
    ToggleSlide(usize),
    SelectPitch(usize),
    SetOctave { pitch: usize, octave: u8 },
    TestSynth,
    ClearBass,

    // knobs, already resolved against the param page
    AdjustSwing(i16),
    AdjustCutoff(f32),    // in octaves
    AdjustResonance(f32),
    AdjustDecay(f32),
    AdjustEnvelopeMod(f32),

    Quit,
}

#[derive(Clone, Debug)]
pub struct TrackView {
    pub name: String,
    pub steps: [bool; STEPS_PER_PATTERN],
    pub volume: f32,
    pub muted: bool,
    pub solo: bool,
    pub loaded: bool,
}

#[derive(Clone, Debug)]
pub struct BassStepView {
    pub label: String, // "C#2", empty when the step is off
    pub on: bool,
    pub slide: bool,
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub playing: bool,
    pub playing_step: Option<u8>,
    pub tempo: u16,
    pub swing: u8,
    pub tracks: Vec<TrackView>,
    pub bass: Vec<BassStepView>,
    pub selected_pitch: Option<usize>,
    pub selected_octave: u8,
    pub cutoff: f32,
    pub resonance: f32,
    pub decay: f32,
    pub envelope_mod: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamPage {
    Groove,
    Filter,
    Envelope,
}

impl ParamPage {
    pub fn next(self) -> Self {
        match self {
            ParamPage::Groove => ParamPage::Filter,
            ParamPage::Filter => ParamPage::Envelope,
            ParamPage::Envelope => ParamPage::Groove,
        }
    }

    pub fn knob_labels(self) -> (&'static str, &'static str) {
        match self {
            ParamPage::Groove => ("SWING", "TEMPO"),
            ParamPage::Filter => ("CUTOFF", "RESO"),
            ParamPage::Envelope => ("DECAY", "ENVMOD"),
        }
    }
}
