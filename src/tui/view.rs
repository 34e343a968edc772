use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;

use crate::shared::{DisplayState, NUM_PITCHES, PITCH_NAMES};

use super::grid::{bass_row, drum_row};
use super::mode::{TuiState, BASS_ROW};

const ACCENT: Color = Color::Rgb(0xff, 0x98, 0x00);

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport
            Constraint::Length(7), // drum grid
            Constraint::Length(3), // bass lane
            Constraint::Length(4), // pitch selector + synth knobs
            Constraint::Min(1),    // key help
        ])
        .split(area);

    draw_transport(frame, sections[0], state, ts);
    draw_drums(frame, sections[1], state, ts);
    draw_bass(frame, sections[2], state, ts);
    draw_synth(frame, sections[3], state, ts);
    draw_help(frame, sections[4]);
}

fn draw_transport(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let play = if state.playing {
        Span::styled("▶ PLAY", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("■ STOP", Style::default().fg(Color::Red))
    };
    let tempo = match &ts.tempo_entry {
        Some(text) => Span::styled(
            format!("TEMPO [{text:_<3}]"),
            Style::default().fg(Color::Black).bg(ACCENT),
        ),
        None => Span::raw(format!("TEMPO {} BPM", state.tempo)),
    };
    let line = Line::from(vec![
        play,
        Span::raw("   "),
        tempo,
        Span::raw(format!("   SWING {}%", state.swing)),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(Block::bordered().title(" beatgrid ")),
        area,
    );
}

fn draw_drums(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let playhead = state.playing_step.map(usize::from);
    let lines: Vec<Line> = state
        .tracks
        .iter()
        .enumerate()
        .map(|(i, t)| drum_row(t, playhead, (ts.row == i).then_some(ts.step)))
        .collect();
    frame.render_widget(
        Paragraph::new(lines).block(Block::bordered().title(" drums ")),
        area,
    );
}

fn draw_bass(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let playhead = state.playing_step.map(usize::from);
    let cursor = (ts.row == BASS_ROW).then_some(ts.step);
    frame.render_widget(
        Paragraph::new(bass_row(&state.bass, playhead, cursor))
            .block(Block::bordered().title(" bassline ")),
        area,
    );
}

fn draw_synth(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let mut pitches = vec![Span::raw("PITCH ")];
    for (i, name) in PITCH_NAMES.iter().enumerate().take(NUM_PITCHES) {
        let style = if state.selected_pitch == Some(i) {
            Style::default().fg(Color::Black).bg(ACCENT)
        } else {
            Style::default()
        };
        pitches.push(Span::styled(format!("{name:<3}"), style));
    }
    pitches.push(Span::raw(format!("  OCT {}", state.selected_octave)));

    let (a, b) = ts.param_page.knob_labels();
    let knobs = Line::from(format!(
        "CUT {:>5.0}Hz  RES {:>4.1}  DEC {:.1}s  ENV {:.1}    [{a}] [{b}]",
        state.cutoff, state.resonance, state.decay, state.envelope_mod,
    ));

    frame.render_widget(
        Paragraph::new(vec![Line::from(pitches), knobs]).block(Block::bordered().title(" synth ")),
        area,
    );
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = "space play  arrows move  enter toggle  s slide  m mute  o/O solo  </> vol  a audition  \
                n/N pitch  v/V oct  T test  t tap  b tempo  c/C clear  tab page  [ ] knob A  - = knob B  esc quit";
    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(Color::DarkGray))
            .wrap(ratatui::widgets::Wrap { trim: true }),
        area,
    );
}
