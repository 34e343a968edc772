use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::pipeline::tempo::{clamp_swing, clamp_tempo};
use crate::shared::NUM_TRACKS;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");
pub const USER_CONFIG_FILE: &str = "beatgrid.toml";

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    defaults: DefaultsConfig,
    #[serde(default)]
    kit: KitConfig,
    #[serde(default)]
    audio: AudioConfig,
}

#[derive(Deserialize, Default)]
struct DefaultsConfig {
    tempo: Option<i32>,
    swing: Option<i32>,
}

#[derive(Deserialize, Default)]
struct KitConfig {
    kick: Option<String>,
    clap: Option<String>,
    hihat: Option<String>,
    open_hihat: Option<String>,
}

#[derive(Deserialize, Default)]
struct AudioConfig {
    sample_rate: Option<u32>,
    lookahead_ms: Option<u32>,
}

pub struct Config {
    kit_dir: PathBuf,
    defaults: DefaultsConfig,
    kit: KitConfig,
    audio: AudioConfig,
}

impl Config {
    /// Built-in defaults, overlaid with `<kit_dir>/beatgrid.toml` when there is one.
    pub fn load(kit_dir: &Path) -> anyhow::Result<Self> {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG)?;

        let path = kit_dir.join(USER_CONFIG_FILE);
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => merge(&mut base, user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }

        Ok(Config {
            kit_dir: kit_dir.to_path_buf(),
            defaults: base.defaults,
            kit: base.kit,
            audio: base.audio,
        })
    }

    pub fn tempo(&self) -> u16 {
        clamp_tempo(self.defaults.tempo.unwrap_or(120))
    }

    pub fn swing(&self) -> u8 {
        clamp_swing(self.defaults.swing.unwrap_or(0))
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate.filter(|r| *r > 0).unwrap_or(44100)
    }

    pub fn lookahead_secs(&self) -> f64 {
        self.audio.lookahead_ms.unwrap_or(50) as f64 / 1000.0
    }

    /// Sample file per drum track, in track order (K, C, H, OH).
    pub fn kit_paths(&self) -> [Option<PathBuf>; NUM_TRACKS] {
        [&self.kit.kick, &self.kit.clap, &self.kit.hihat, &self.kit.open_hihat]
            .map(|name| name.as_ref().map(|n| self.kit_dir.join(n)))
    }
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    if user.defaults.tempo.is_some() {
        base.defaults.tempo = user.defaults.tempo;
    }
    if user.defaults.swing.is_some() {
        base.defaults.swing = user.defaults.swing;
    }
    if user.kit.kick.is_some() {
        base.kit.kick = user.kit.kick;
    }
    if user.kit.clap.is_some() {
        base.kit.clap = user.kit.clap;
    }
    if user.kit.hihat.is_some() {
        base.kit.hihat = user.kit.hihat;
    }
    if user.kit.open_hihat.is_some() {
        base.kit.open_hihat = user.kit.open_hihat;
    }
    if user.audio.sample_rate.is_some() {
        base.audio.sample_rate = user.audio.sample_rate;
    }
    if user.audio.lookahead_ms.is_some() {
        base.audio.lookahead_ms = user.audio.lookahead_ms;
    }
}
