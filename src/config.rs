//! Configuration management for debates using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::annotation::DEFAULT_STOP_WORDS;
use crate::corpus::DEFAULT_ANNOTATIONS_FILE;
use crate::pipeline::{PipelinePaths, ReferenceColumns};

/// Default number of documents handed to the annotation engine at once.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Input subdirectory name.
const EXTERNAL_SUBDIR: &str = "external";

/// Output subdirectory name.
const PROCESSED_SUBDIR: &str = "processed";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Directory holding the raw corpus and reference table.
    pub external_dir: PathBuf,
    /// Directory receiving the processed tables, blob and manifest.
    pub processed_dir: PathBuf,
    /// Raw corpus override (defaults to a file under `external_dir`).
    pub raw_corpus: Option<PathBuf>,
    /// Country reference override (defaults to a file under `external_dir`).
    pub reference_table: Option<PathBuf>,
    /// Documents per annotation batch.
    pub batch_size: usize,
    /// Column names in the country reference table.
    pub reference_columns: ReferenceColumns,
    /// Stop words excluded from bags of words; `None` uses the built-in list.
    pub stop_words: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        // Default to ~/Documents/debates/ for user data
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("debates");
        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            external_dir: data_dir.join(EXTERNAL_SUBDIR),
            processed_dir: data_dir.join(PROCESSED_SUBDIR),
            data_dir,
            raw_corpus: None,
            reference_table: None,
            batch_size: DEFAULT_BATCH_SIZE,
            reference_columns: ReferenceColumns::default(),
            stop_words: None,
        }
    }

    /// Every input and output location of a preprocessing run.
    pub fn pipeline_paths(&self) -> PipelinePaths {
        let mut paths = PipelinePaths::new(&self.external_dir, &self.processed_dir);
        if let Some(ref raw) = self.raw_corpus {
            paths.raw_corpus = raw.clone();
        }
        if let Some(ref reference) = self.reference_table {
            paths.reference_table = reference.clone();
        }
        paths
    }

    /// The paragraph table the corpus is loaded from.
    pub fn paragraphs_path(&self) -> PathBuf {
        self.pipeline_paths().paragraphs
    }

    /// The annotation blob.
    pub fn annotations_path(&self) -> PathBuf {
        self.processed_dir.join(DEFAULT_ANNOTATIONS_FILE)
    }

    /// Effective stop-word list.
    pub fn stop_words(&self) -> Vec<String> {
        match self.stop_words {
            Some(ref words) => words.clone(),
            None => DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Raw corpus CSV path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_corpus: Option<String>,
    /// Country reference CSV path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_table: Option<String>,
    /// Output directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_dir: Option<String>,
    /// Documents per annotation batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u64>,
    /// Country name column in the reference table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_name_column: Option<String>,
    /// Country code column in the reference table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_code_column: Option<String>,
    /// Custom stop-word list. An empty list disables stop-word filtering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[prefer(default)]
    pub stop_words: Option<Vec<String>>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers debates config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("debates").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_else(|e| {
                    tracing::warn!("{}", e);
                    Self::default()
                }),
                None => Self::default(),
            },
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            *settings = Settings {
                batch_size: settings.batch_size,
                reference_columns: settings.reference_columns.clone(),
                stop_words: settings.stop_words.clone(),
                ..Settings::with_data_dir(self.resolve_path(data_dir, base_dir))
            };
        }
        if let Some(ref raw) = self.raw_corpus {
            settings.raw_corpus = Some(self.resolve_path(raw, base_dir));
        }
        if let Some(ref reference) = self.reference_table {
            settings.reference_table = Some(self.resolve_path(reference, base_dir));
        }
        if let Some(ref processed) = self.processed_dir {
            settings.processed_dir = self.resolve_path(processed, base_dir);
        }
        if let Some(batch_size) = self.batch_size {
            settings.batch_size = usize::try_from(batch_size).unwrap_or(usize::MAX).max(1);
        }
        if let Some(ref column) = self.reference_name_column {
            settings.reference_columns.name = column.clone();
        }
        if let Some(ref column) = self.reference_code_column {
            settings.reference_columns.code = column.clone();
        }
        if let Some(ref words) = self.stop_words {
            settings.stop_words = Some(words.clone());
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Data directory override (--data-dir flag or DEBATES_DATA_DIR).
    pub data_dir: Option<PathBuf>,
}

/// Look for a config file inside the data directory.
fn find_config_in_data_dir(data_dir: &Path) -> Option<PathBuf> {
    let extensions = ["json", "yaml", "yml", "toml"];
    let basenames = ["debates", "config"];

    for basename in basenames {
        for ext in extensions {
            let path = data_dir.join(format!("{}.{}", basename, ext));
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

/// Load config from file sources, in priority order.
async fn load_file_config(options: &LoadOptions, data_dir: Option<&Path>) -> Config {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("{}", e);
                Config::default()
            });
    }

    // Priority 2: Config inside the data dir
    if let Some(data_dir) = data_dir {
        if let Some(config_path) = find_config_in_data_dir(data_dir) {
            tracing::debug!("Found config in data dir: {}", config_path.display());
            return Config::load_from_path(&config_path)
                .await
                .unwrap_or_else(|_| Config::default());
        }
    }

    // Priority 3: Auto-discover via prefer
    Config::load().await
}

/// Make a path absolute against the current directory.
fn absolute(path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

/// Load settings from config file and environment, with options.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let data_dir_override = options.data_dir.as_deref().map(absolute);

    let config = load_file_config(&options, data_dir_override.as_deref()).await;

    let mut settings = Settings::default();

    // Determine base directory for resolving relative paths
    let base_dir = if options.use_cwd {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --data-dir takes precedence over the config file
    if let Some(data_dir) = data_dir_override {
        let processed_overridden = config.processed_dir.is_some();
        let processed_dir = settings.processed_dir.clone();
        settings.external_dir = data_dir.join(EXTERNAL_SUBDIR);
        settings.processed_dir = if processed_overridden {
            processed_dir
        } else {
            data_dir.join(PROCESSED_SUBDIR)
        };
        settings.data_dir = data_dir;
    }

    (settings, config)
}
