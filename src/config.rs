use std::path::{Path, PathBuf};

use figment::{providers::Format, Figment};
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub system: ConfigSystem,
    pub camera: ConfigCamera,
    pub capture: ConfigCapture,
    #[serde(default)]
    pub button: ConfigButton,
    pub smtp: ConfigSmtp,
    pub chime: ConfigChime,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigSystem {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ConfigSystem {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigCamera {
    pub stream_url: String,
    /// Seconds before a stream request is abandoned. 0 disables the timeout.
    #[serde(default = "default_stream_timeout")]
    pub timeout: u64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigCapture {
    pub image_dir: PathBuf,
    #[serde(default = "default_frame_limit")]
    pub frame_limit: usize,
    /// Minimum seconds between two accepted button presses.
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigButton {
    #[serde(default = "default_button_pin")]
    pub pin: u8,
}

impl Default for ConfigButton {
    fn default() -> Self {
        Self {
            pin: default_button_pin(),
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigSmtp {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub recipient: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct ConfigChime {
    #[serde(default = "default_chime_player")]
    pub player: String,
    pub file: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_stream_timeout() -> u64 {
    30
}

fn default_frame_limit() -> usize {
    8
}

fn default_cooldown() -> u64 {
    5
}

fn default_button_pin() -> u8 {
    2
}

fn default_chime_player() -> String {
    "mpg123".to_string()
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, String> {
    let cfg: Config = Figment::new()
        .merge(figment::providers::Env::prefixed("BELL_SINK_").split("__"))
        .merge(figment::providers::Toml::file(path))
        .extract()
        .map_err(|e| e.to_string())?;

    if cfg.capture.frame_limit == 0 {
        return Err("capture.frame_limit must be at least 1".to_string());
    }

    Ok(cfg)
}
