mod shared;
mod tui;
mod audio_api;
mod audio;
mod config;
mod loader;
mod middle;
mod pipeline;

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use audio::AudioContext;
use config::Config;
use middle::Middle;
use pipeline::project::ProjectState;
use shared::InputEvent;

const LOG_FILE: &str = "beatgrid.log";

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let kit_dir = args
        .iter()
        .find(|a| !a.starts_with('-'))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("samples"));

    if let Err(e) = run(kit_dir) {
        log::error!("fatal: {e:#}");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// The terminal is in raw mode while we run, so everything goes to a file.
fn init_logging(verbose: bool) {
    use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    match File::create(LOG_FILE) {
        Ok(file) => {
            let config = ConfigBuilder::new().set_time_format_rfc3339().build();
            let _ = WriteLogger::init(level, config, file);
        }
        Err(e) => eprintln!("could not create {LOG_FILE}: {e}"),
    }
    log::info!("beatgrid starting (log level: {level:?})");
}

fn run(kit_dir: PathBuf) -> anyhow::Result<()> {
    let config = Config::load(&kit_dir)?;
    let state = ProjectState::new(config.tempo(), config.swing());
    let mut middle = Middle::new(state, AudioContext::new(), config.lookahead_secs());

    // A missing sample only leaves its track silent.
    for (track, path) in config.kit_paths().into_iter().enumerate() {
        let Some(path) = path else { continue };
        match loader::sample_loader::load(&path, config.sample_rate()) {
            Ok((id, buffer)) => {
                log::info!("loaded {} as {id} ({} frames)", path.display(), buffer.len());
                middle.attach_sample(track, id, buffer);
            }
            Err(e) => log::warn!("track {track} has no sample: {e:#}"),
        }
    }

    terminal::enable_raw_mode()?;
    // Enable keyboard enhancement for real press/release detection.
    // Falls back gracefully if the terminal doesn't support it.
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::PushKeyboardEnhancementFlags(
            crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        )
    );
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps
    let mut last_tick = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let ds = middle.display_state();
        tui_state.selected_pitch = ds.selected_pitch;
        tui_state.selected_octave = ds.selected_octave;

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, &tui_state);
        })?;

        let events = tui::input::poll_input(tick_rate, &mut tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                log::info!("quitting");
                drop(term);
                return Ok(());
            }
            middle.handle_input(event);
        }

        let elapsed = last_tick.elapsed().as_secs_f64();
        last_tick = Instant::now();
        middle.tick(elapsed);
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PopKeyboardEnhancementFlags
        );
        let _ = terminal::disable_raw_mode();
    }
}
