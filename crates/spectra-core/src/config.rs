//! Highlighting configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! `#[serde(default)]` on every section means a config file only has to
//! mention what it changes:
//!
//! ```toml
//! [highlight]
//! theme = "groovy"
//!
//! [analyzer]
//! command = "sourcekitten"
//! args = ["syntax", "--text"]
//! input = "argument"
//! languages = ["swift"]
//!
//! [languages.groovy]
//! patterns = [
//!     { kind = "comment", pattern = "//.*" },
//!     { kind = "number", pattern = "\\d+" },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use spectra_syntax::{AnalyzerCommand, AnalyzerInput, PatternTable, detect_language};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Theme and scheduling settings
    pub highlight: HighlightConfig,

    /// External analyzer settings
    pub analyzer: AnalyzerConfig,

    /// Language-specific settings
    pub languages: HashMap<String, LanguageConfig>,
}

impl Config {
    /// Loads config from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::load_from_default_path() {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "using default config");
                Self::default()
            }
        }
    }

    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads from the default config path.
    fn load_from_default_path() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns the default config file path.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("spectra").join("config.toml"))
    }

    /// Saves the config to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::default_path()?)
    }

    /// Saves the config to `path`, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns config for a specific language.
    pub fn language(&self, lang: &str) -> LanguageConfig {
        self.languages.get(lang).cloned().unwrap_or_default()
    }

    /// Detects the language of `filename`.
    ///
    /// Extensions listed under `[languages.*]` take precedence over the
    /// builtin extension map.
    pub fn detect_language(&self, filename: &str) -> String {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        self.languages
            .iter()
            .find(|(_, lang)| lang.extensions.iter().any(|e| e == ext))
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| detect_language(filename).to_string())
    }
}

/// Theme and scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Builtin theme name or path to a theme file. Unset picks the
    /// palette that goes with the document's language.
    pub theme: Option<String>,

    /// Debounce before retokenizing, in ms (0 = next idle tick)
    pub settle_ms: u64,

    /// Line height used by the layout service
    pub line_height: f32,
}

impl HighlightConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: None,
            settle_ms: 0,
            line_height: 16.0,
        }
    }
}

/// External analyzer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Analyzer executable (None disables the analyzer)
    pub command: Option<String>,

    /// Arguments placed before the source handoff
    pub args: Vec<String>,

    /// How the source reaches the analyzer
    pub input: AnalyzerInput,

    /// Kill the analyzer after this many ms
    pub timeout_ms: u64,

    /// Languages routed to the analyzer
    pub languages: Vec<String>,
}

impl AnalyzerConfig {
    /// Returns true if `language` should be tokenized by the analyzer.
    pub fn handles(&self, language: &str) -> bool {
        self.command.is_some() && self.languages.iter().any(|l| l == language)
    }

    /// Builds the analyzer command line, if one is configured.
    pub fn command(&self) -> Option<AnalyzerCommand> {
        let program = self.command.as_ref()?;
        Some(
            AnalyzerCommand::new(program.clone())
                .args(self.args.iter().cloned())
                .input(self.input)
                .timeout(Duration::from_millis(self.timeout_ms)),
        )
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            input: AnalyzerInput::Stdin,
            timeout_ms: 5000,
            languages: Vec::new(),
        }
    }
}

/// Language-specific configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Pattern table replacing the builtin one
    pub patterns: Option<PatternTable>,

    /// Extra file extensions for this language
    pub extensions: Vec<String>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
