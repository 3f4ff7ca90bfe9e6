//! Engine configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `SKIRMISH_*` environment variables (e.g. `SKIRMISH_BOARD_SIZE=12`).

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::combat::{
    Board, EffectCatalog, PowerCatalog, TargetingOptions, DEFAULT_BOARD_SIZE, MAX_BOARD_SIZE,
};
use crate::error::EngineError;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SKIRMISH_";

/// Errors while loading configuration, catalogs or scenarios
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Invalid(String),
}

/// Tunable engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Width and height of the square board
    pub board_size: i32,
    /// Leave the caster out of their own bursts unless a call says otherwise
    pub exclude_caster_from_burst: bool,
    /// Speed for combatants defined without a class or explicit speed
    pub default_speed: u32,
    /// JSON status-effect catalog replacing the built-in one
    pub effects_catalog: Option<PathBuf>,
    /// JSON power catalog replacing the built-in one
    pub powers_catalog: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            exclude_caster_from_burst: true,
            default_speed: 5,
            effects_catalog: None,
            powers_catalog: None,
        }
    }
}

impl EngineConfig {
    /// Layered provider: defaults, then `file` if given, then the environment
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file_exact(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate the configuration
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = file {
            std::fs::metadata(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let config: EngineConfig = Self::figment(file).extract().map_err(Box::new)?;
        config.validate()?;
        debug!("Loaded engine config: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BOARD_SIZE).contains(&self.board_size) {
            return Err(ConfigError::Invalid(format!(
                "board_size must be between 1 and {}, got {}",
                MAX_BOARD_SIZE, self.board_size
            )));
        }
        Ok(())
    }

    pub fn board(&self) -> Board {
        Board::new(self.board_size)
    }

    pub fn targeting(&self) -> TargetingOptions {
        TargetingOptions {
            exclude_caster: self.exclude_caster_from_burst,
        }
    }

    /// Effect and power catalogs, built-in unless a file is configured.
    ///
    /// Every power is checked against the effect catalog.
    pub fn catalogs(&self) -> Result<(EffectCatalog, PowerCatalog), ConfigError> {
        let effects = match &self.effects_catalog {
            Some(path) => EffectCatalog::load(path)?,
            None => EffectCatalog::standard(),
        };
        let powers = match &self.powers_catalog {
            Some(path) => PowerCatalog::load(path)?,
            None => PowerCatalog::standard(),
        };
        powers.validate(&effects)?;
        Ok((effects, powers))
    }
}
