use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::database::{DATABASE_FILE, DEFAULT_POS_FIELDS};

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub corpus: CorpusConfig,
    pub ingest: IngestConfig,
    pub browse: BrowseConfig,
    pub logging: LoggingConfig,
}

/// Data directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
    /// Database file name inside the data directory.
    pub database_file: String,
}

/// Which corpus to work on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Table prefix of the corpus.
    pub name: String,
    /// POS fields per token. The IPA dictionary emits six.
    pub pos_fields: usize,
}

/// Sentence segmentation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// End the pending sentence at the end of every input line.
    pub break_on_line_end: bool,
    /// Empty the corpus before ingesting.
    pub clear_first: bool,
    /// Encoding label of the MeCab output, e.g. `utf-8`, `shift_jis`, `euc-jp`.
    pub encoding: String,
}

/// Query defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    /// Rows per frequency or concordance page.
    pub page_size: u32,
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 0 = warnings, 1 = info, 2 = debug, 3 = trace.
    pub verbosity: u8,
    /// Also write JSON logs under `<data dir>/logs`.
    pub log_to_file: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_file: DATABASE_FILE.to_string(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            name: "novels".to_string(),
            pos_fields: DEFAULT_POS_FIELDS,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            break_on_line_end: true,
            clear_first: false,
            encoding: "utf-8".to_string(),
        }
    }
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self { page_size: 30 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbosity: 1,
            log_to_file: false,
        }
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Missing(PathBuf),
    Invalid { path: PathBuf, error: String },
}

impl ConfigSource {
    /// Emit the outcome as a log event.
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => log::info!("Loaded config from {}", path.display()),
            ConfigSource::Missing(path) => {
                log::debug!("No config file at {}, using defaults", path.display())
            }
            ConfigSource::Invalid { path, error } => {
                log::warn!("Failed to parse config at {}: {error}, using defaults", path.display())
            }
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/novel-freq/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        let (config, source) = Self::read(path);
        source.log();
        config
    }

    /// Like [`AppConfig::load`], but leaves logging the outcome to the caller.
    /// The binary loads config before its subscriber exists.
    pub fn load_deferred() -> (Self, ConfigSource) {
        Self::read(&Self::config_path())
    }

    /// Read `path` without logging.
    pub fn read(path: &Path) -> (Self, ConfigSource) {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return (Self::default(), ConfigSource::Missing(path.to_path_buf())),
        };
        match toml::from_str(&contents) {
            Ok(config) => (config, ConfigSource::File(path.to_path_buf())),
            Err(e) => (
                Self::default(),
                ConfigSource::Invalid {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                },
            ),
        }
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("novel-freq"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    /// Full path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join(&self.data.database_file)
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("novel-freq").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
