use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use triage_engine::{write_atomic, EnrichSettings, KvError};
use triage_logging::{triage_info, triage_warn, LogDestination, DEFAULT_LOG_FILE};

const SETTINGS_FILENAME: &str = "settings.ron";
const DATA_DIR_ENV: &str = "TAB_TRIAGE_DATA";
const DEFAULT_DATA_DIR: &str = "./triage_data";

/// User-editable configuration, stored as RON next to the saved items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_destination: LogDestination,
    pub log_file: PathBuf,
    pub verbose: bool,
    /// Where saved items live. Defaults to the settings directory.
    pub store_dir: Option<PathBuf>,
    pub batch_size: usize,
    pub item_timeout_ms: u64,
    pub batch_pause_ms: u64,
    pub icon_timeout_ms: u64,
    pub summarizer_endpoint: Option<String>,
    pub summarizer_api_key: Option<String>,
    /// RON list of tabs to triage. The built-in sample is used when unset.
    pub tabs_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let enrich = EnrichSettings::default();
        Self {
            log_destination: LogDestination::File,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            verbose: false,
            store_dir: None,
            batch_size: enrich.batch_size,
            item_timeout_ms: enrich.item_timeout.as_millis() as u64,
            batch_pause_ms: enrich.batch_pause.as_millis() as u64,
            icon_timeout_ms: triage_engine::DEFAULT_SAMPLE_TIMEOUT.as_millis() as u64,
            summarizer_endpoint: None,
            summarizer_api_key: None,
            tabs_file: None,
        }
    }
}

impl Settings {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub fn enrich_settings(&self) -> EnrichSettings {
        EnrichSettings {
            batch_size: self.batch_size.max(1),
            item_timeout: Duration::from_millis(self.item_timeout_ms),
            batch_pause: Duration::from_millis(self.batch_pause_ms),
        }
    }

    pub fn icon_timeout(&self) -> Duration {
        Duration::from_millis(self.icon_timeout_ms)
    }

    pub fn store_dir(&self, data_dir: &Path) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(|| data_dir.to_path_buf())
    }
}

/// First CLI argument, then `TAB_TRIAGE_DATA`, then `./triage_data`.
pub fn resolve_data_dir(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn data_dir_from_env() -> PathBuf {
    resolve_data_dir(std::env::args().nth(1), std::env::var(DATA_DIR_ENV).ok())
}

/// Reads settings from `data_dir`. Missing or unreadable files fall back to defaults.
///
/// Runs before the logger exists, so problems are returned for logging later.
pub fn load(data_dir: &Path) -> (Settings, Option<String>) {
    let path = data_dir.join(SETTINGS_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return (Settings::default(), None);
        }
        Err(err) => {
            return (
                Settings::default(),
                Some(format!("Failed to read settings from {:?}: {}", path, err)),
            );
        }
    };

    match ron::from_str(&content) {
        Ok(settings) => (settings, None),
        Err(err) => (
            Settings::default(),
            Some(format!("Failed to parse settings from {:?}: {}", path, err)),
        ),
    }
}

pub fn save(data_dir: &Path, settings: &Settings) -> Result<(), KvError> {
    let pretty = ron::ser::PrettyConfig::new();
    let content = ron::ser::to_string_pretty(settings, pretty)
        .map_err(|err| KvError::Corrupt {
            key: SETTINGS_FILENAME.to_string(),
            message: err.to_string(),
        })?;
    let path = data_dir.join(SETTINGS_FILENAME);
    write_atomic(&path, &content)?;
    triage_info!("Saved settings to {:?}", path);
    Ok(())
}

/// Persists settings, logging instead of failing; the session keeps running either way.
pub fn save_or_warn(data_dir: &Path, settings: &Settings) {
    if let Err(err) = save(data_dir, settings) {
        triage_warn!("Failed to save settings to {:?}: {}", data_dir, err);
    }
}
