/// Application configuration: persisted as TOML next to the fight database.
///
/// Every field has a default so a partial or older `config.toml` still loads.
/// The file is only written when `save` is called; a missing file is not an
/// error and yields `AppConfig::default()`.
use crate::{
    calc::CombatLevels,
    equipment::{BoltAmmo, DartAmmo, StrongBoltAmmo},
    error::{Result, TrackerError},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// JSON-lines file the host plugin appends feed events to.
    #[serde(default)]
    pub feed_path: PathBuf,

    /// Seconds without a scored attack before an open fight closes.
    #[serde(default = "default_fight_timeout_secs")]
    pub fight_timeout_secs: u64,

    /// Seconds an interaction-only fight lives before it is discarded.
    #[serde(default = "default_pending_grace_secs")]
    pub pending_grace_secs: u64,

    /// Fights kept in history; 0 keeps everything.
    #[serde(default = "default_fight_history_limit")]
    pub fight_history_limit: usize,

    /// Only track fights inside Last Man Standing.
    #[serde(default)]
    pub restrict_to_lms: bool,

    #[serde(default)]
    pub bolt_choice: BoltAmmo,

    #[serde(default)]
    pub strong_bolt_choice: StrongBoltAmmo,

    #[serde(default)]
    pub dart_choice: DartAmmo,

    /// Levels assumed for combatants whose stats the host cannot read.
    #[serde(default)]
    pub assumed_levels: CombatLevels,
}

fn default_fight_timeout_secs() -> u64 { 21 }
fn default_pending_grace_secs() -> u64 { 5 }
fn default_fight_history_limit() -> usize { 1000 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed_path:           PathBuf::new(),
            fight_timeout_secs:  default_fight_timeout_secs(),
            pending_grace_secs:  default_pending_grace_secs(),
            fight_history_limit: default_fight_history_limit(),
            restrict_to_lms:     false,
            bolt_choice:         BoltAmmo::default(),
            strong_bolt_choice:  StrongBoltAmmo::default(),
            dart_choice:         DartAmmo::default(),
            assumed_levels:      CombatLevels::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

pub fn load_or_default(config_dir: &Path) -> Result<AppConfig> {
    let path = config_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = std::fs::read_to_string(&path)
        .map_err(|source| TrackerError::Read { path: path.clone(), source })?;
    Ok(toml::from_str(&raw)?)
}

pub fn save(config: &AppConfig, config_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(config_dir)
        .map_err(|source| TrackerError::Write { path: config_dir.to_path_buf(), source })?;
    let raw = toml::to_string_pretty(config)?;
    let path = config_dir.join(CONFIG_FILE);
    std::fs::write(&path, raw).map_err(|source| TrackerError::Write { path, source })
}
