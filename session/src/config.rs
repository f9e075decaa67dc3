use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::error::SessionErr;

pub const CONFIG_TOML_FILE: &str = "config.toml";

const DEFAULT_PARTICIPANT_NAME: &str = "P1";
const DEFAULT_AI_COUNT: u32 = 3;
const DEFAULT_PACING_MS: u64 = 120;
const DEFAULT_PUMP_TICK_MS: u64 = 10;
const DEFAULT_PUMP_MAX_ITERATIONS: u32 = 30;
const DEFAULT_PUMP_MAX_ITERATIONS_AFTER_VOTE: u32 = 80;

/// Options a user can put in `config.toml`. Every field is optional; unset
/// values fall back to the defaults in [`SessionConfig`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigToml {
    pub participant_name: Option<String>,
    pub ai_count: Option<u32>,
    pub use_fool: Option<bool>,

    /// Pause between two revealed messages.
    pub pacing_ms: Option<u64>,
    pub pump_tick_ms: Option<u64>,
    pub pump_max_iterations: Option<u32>,
    pub pump_max_iterations_after_vote: Option<u32>,

    /// Ask the participant why they voted as they did before the AI tally.
    pub post_vote_interview: Option<bool>,

    /// Game service location, used by front-ends that build the client.
    pub base_url: Option<String>,
}

/// Values supplied on the command line; they win over `config.toml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub participant_name: Option<String>,
    pub ai_count: Option<u32>,
    pub post_vote_interview: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub participant_name: String,
    pub ai_count: u32,
    pub use_fool: bool,
    pub pacing: Duration,
    pub pump_tick: Duration,
    pub pump_max_iterations: u32,
    pub pump_max_iterations_after_vote: u32,
    pub post_vote_interview: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_toml(ConfigToml::default(), ConfigOverrides::default())
    }
}

impl SessionConfig {
    pub fn from_toml(cfg: ConfigToml, overrides: ConfigOverrides) -> Self {
        let ConfigOverrides {
            participant_name,
            ai_count,
            post_vote_interview,
        } = overrides;
        Self {
            participant_name: participant_name
                .or(cfg.participant_name)
                .unwrap_or_else(|| DEFAULT_PARTICIPANT_NAME.to_string()),
            ai_count: ai_count.or(cfg.ai_count).unwrap_or(DEFAULT_AI_COUNT),
            use_fool: cfg.use_fool.unwrap_or(true),
            pacing: Duration::from_millis(cfg.pacing_ms.unwrap_or(DEFAULT_PACING_MS)),
            pump_tick: Duration::from_millis(cfg.pump_tick_ms.unwrap_or(DEFAULT_PUMP_TICK_MS)),
            pump_max_iterations: cfg
                .pump_max_iterations
                .unwrap_or(DEFAULT_PUMP_MAX_ITERATIONS),
            pump_max_iterations_after_vote: cfg
                .pump_max_iterations_after_vote
                .unwrap_or(DEFAULT_PUMP_MAX_ITERATIONS_AFTER_VOTE),
            post_vote_interview: post_vote_interview
                .or(cfg.post_vote_interview)
                .unwrap_or(false),
        }
    }
}

/// Read `config.toml` at `path`. A missing file yields the empty config.
pub fn load_config_toml(path: &Path) -> Result<ConfigToml> {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<ConfigToml>(&contents).map_err(|err| {
            tracing::error!("Failed to parse {}: {err}", path.display());
            SessionErr::Config(format!("{}: {err}", path.display()))
        }),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("{} not found, using defaults", path.display());
            Ok(ConfigToml::default())
        }
        Err(err) => Err(SessionErr::Persist(err)),
    }
}

/// Directory holding local session files.
///
/// `LIAR_PLAY_HOME` wins when set and non-empty, otherwise `~/.liar-play`.
/// The directory is not required to exist.
pub fn find_play_home() -> std::io::Result<PathBuf> {
    if let Ok(val) = std::env::var("LIAR_PLAY_HOME")
        && !val.is_empty()
    {
        return Ok(PathBuf::from(val));
    }
    let mut p = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(ErrorKind::NotFound, "Could not find home directory")
    })?;
    p.push(".liar-play");
    Ok(p)
}
