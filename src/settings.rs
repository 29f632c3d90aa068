//! Runtime settings, layered: built-in defaults, then an optional
//! `placeresolver.toml`, then `PLACERESOLVER__SECTION__KEY` environment
//! variables.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const CONFIG_FILE_STEM: &str = "placeresolver";
pub const ENV_PREFIX: &str = "PLACERESOLVER";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub enabled: bool,
    pub place_capacity: usize,
    pub guess_capacity: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Place strings closer than this edit distance count as duplicates.
    pub duplicate_distance: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSettings {
    pub dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    pub filter: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub cache: CacheSettings,
    pub validation: ValidationSettings,
    pub data: DataSettings,
    pub log: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                enabled: true,
                place_capacity: 4096,
                guess_capacity: 4096,
            },
            validation: ValidationSettings { duplicate_distance: 5 },
            data: DataSettings { dir: PathBuf::from("data") },
            log: LogSettings { filter: "info".to_string() },
        }
    }
}

impl Settings {
    /// Loads settings from `path` when given (the file must exist), else
    /// from `placeresolver.toml` in the working directory if there is one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();
        let builder = Config::builder()
            .set_default("cache.enabled", defaults.cache.enabled)?
            .set_default("cache.place_capacity", defaults.cache.place_capacity as u64)?
            .set_default("cache.guess_capacity", defaults.cache.guess_capacity as u64)?
            .set_default("validation.duplicate_distance", defaults.validation.duplicate_distance as u64)?
            .set_default("data.dir", defaults.data.dir.to_string_lossy().to_string())?
            .set_default("log.filter", defaults.log.filter)?;
        let builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(CONFIG_FILE_STEM).required(false)),
        };
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
