use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::shared::{InputEvent, ParamPage, NUM_PITCHES};

use super::mode::TuiState;

const CUTOFF_STEP: f32 = 1.0 / 6.0; // octaves per knob click

// poll for a key, keep cursor/page state in TuiState and resolve the key
// into semantic InputEvents for the middle layer
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

pub fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    if ts.tempo_entry.is_some() {
        return handle_tempo_entry(code, ts);
    }

    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::PlayPress],

        KeyCode::Up => { ts.move_cursor(-1, 0); vec![] }
        KeyCode::Down => { ts.move_cursor(1, 0); vec![] }
        KeyCode::Left => { ts.move_cursor(0, -1); vec![] }
        KeyCode::Right => { ts.move_cursor(0, 1); vec![] }

        KeyCode::Enter | KeyCode::Char('x') => vec![toggle_at_cursor(ts)],
        KeyCode::Char('s') if ts.on_bass_row() => vec![InputEvent::ToggleSlide(ts.step)],

        // per-track buttons, drum rows only
        KeyCode::Char('m') if !ts.on_bass_row() => vec![InputEvent::Mute(ts.row)],
        KeyCode::Char('o') if !ts.on_bass_row() => {
            vec![InputEvent::Solo { track: ts.row, additive: false }]
        }
        KeyCode::Char('O') if !ts.on_bass_row() => {
            vec![InputEvent::Solo { track: ts.row, additive: true }]
        }
        KeyCode::Char('<') if !ts.on_bass_row() => {
            vec![InputEvent::AdjustVolume { track: ts.row, delta: -0.1 }]
        }
        KeyCode::Char('>') if !ts.on_bass_row() => {
            vec![InputEvent::AdjustVolume { track: ts.row, delta: 0.1 }]
        }
        KeyCode::Char('a') if !ts.on_bass_row() => vec![InputEvent::Audition(ts.row)],

        // bass pitch selector
        KeyCode::Char('n') => vec![InputEvent::SelectPitch(cycle_pitch(ts.selected_pitch, 1))],
        KeyCode::Char('N') => vec![InputEvent::SelectPitch(cycle_pitch(ts.selected_pitch, -1))],
        KeyCode::Char('v') => octave_event(ts, 1),
        KeyCode::Char('V') => octave_event(ts, -1),
        KeyCode::Char('T') => vec![InputEvent::TestSynth],

        KeyCode::Char('t') => vec![InputEvent::TapTempo],
        KeyCode::Char('b') => { ts.tempo_entry = Some(String::new()); vec![] }
        KeyCode::Char('c') => vec![InputEvent::ClearDrums],
        KeyCode::Char('C') => vec![InputEvent::ClearBass],

        KeyCode::Tab => { ts.param_page = ts.param_page.next(); vec![] }
        KeyCode::Char('[') => resolve_knob_a(-1.0, ts),
        KeyCode::Char(']') => resolve_knob_a(1.0, ts),
        KeyCode::Char('-') => resolve_knob_b(-1.0, ts),
        KeyCode::Char('=') => resolve_knob_b(1.0, ts),

        _ => vec![],
    }
}

fn handle_tempo_entry(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Enter => match ts.tempo_entry.take() {
            Some(text) => vec![InputEvent::EnterTempo(text)],
            None => vec![],
        },
        KeyCode::Esc => { ts.tempo_entry = None; vec![] }
        KeyCode::Backspace => {
            if let Some(text) = ts.tempo_entry.as_mut() {
                text.pop();
            }
            vec![]
        }
        KeyCode::Char(c) if c.is_ascii_digit() => {
            if let Some(text) = ts.tempo_entry.as_mut() {
                if text.len() < 3 {
                    text.push(c);
                }
            }
            vec![]
        }
        _ => vec![],
    }
}

fn toggle_at_cursor(ts: &TuiState) -> InputEvent {
    if ts.on_bass_row() {
        InputEvent::ToggleBassNote(ts.step)
    } else {
        InputEvent::ToggleStep { track: ts.row, step: ts.step }
    }
}

fn cycle_pitch(current: Option<usize>, dir: isize) -> usize {
    match current {
        None => 0,
        Some(p) => (p as isize + dir).rem_euclid(NUM_PITCHES as isize) as usize,
    }
}

fn octave_event(ts: &TuiState, dir: i8) -> Vec<InputEvent> {
    let pitch = ts.selected_pitch.unwrap_or(0);
    let octave = (ts.selected_octave as i8 + dir).max(0) as u8;
    vec![InputEvent::SetOctave { pitch, octave }]
}

// knob a: swing / cutoff / decay depending on page
fn resolve_knob_a(dir: f32, ts: &TuiState) -> Vec<InputEvent> {
    match ts.param_page {
        ParamPage::Groove => vec![InputEvent::AdjustSwing(dir as i16)],
        ParamPage::Filter => vec![InputEvent::AdjustCutoff(dir * CUTOFF_STEP)],
        ParamPage::Envelope => vec![InputEvent::AdjustDecay(dir * 0.1)],
    }
}

// knob b: tempo / resonance / envelope mod depending on page
fn resolve_knob_b(dir: f32, ts: &TuiState) -> Vec<InputEvent> {
    match ts.param_page {
        ParamPage::Groove => vec![InputEvent::AdjustTempo(dir as i16)],
        ParamPage::Filter => vec![InputEvent::AdjustResonance(dir * 0.5)],
        ParamPage::Envelope => vec![InputEvent::AdjustEnvelopeMod(dir * 0.1)],
    }
}
