//!
//! This module defines the configuration structures of fenceguard and how they are loaded:
//! an explicit file, or the first `.fenceguard.toml` / `fenceguard.toml` found walking up
//! from the current directory.

use crate::engine::{DEFAULT_STYLE_TARGET, EngineSettings};
use crate::grammar::{DEFAULT_FENCE_TAG, DEFAULT_MAX_BODY_BYTES, FenceGrammar};
use crate::highlight::DEFAULT_THEME;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File names searched for during discovery, in order of precedence
pub const CONFIG_FILES: &[&str] = &[".fenceguard.toml", "fenceguard.toml"];

/// Fence recognition settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FenceConfig {
    /// Tag name of a fence (`pre` matches `<pre ...>...</pre>`)
    pub tag: String,
    /// Bodies larger than this are left unhighlighted
    pub max_body_bytes: usize,
}

impl Default for FenceConfig {
    fn default() -> Self {
        Self {
            tag: DEFAULT_FENCE_TAG.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Highlighter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct HighlightConfig {
    /// Highlighting theme (see `fenceguard themes`)
    pub theme: String,
    /// Wrapping containers used when a fence has no `cssfile`/`styleTarget` attribute
    pub default_style_target: String,
    /// Emit CSS classes and one stylesheet per language instead of inline styles
    pub class_based: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            default_style_target: DEFAULT_STYLE_TARGET.to_string(),
            class_based: true,
        }
    }
}

/// Stylesheet assets of the style targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AssetsConfig {
    /// Directory holding `{style target}.css` files
    pub dir: String,
    /// URL under which `dir` is served
    pub url: String,
    /// Asset linked first whenever a run found snippets
    pub default_stylesheet: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: "assets".to_string(),
            url: "/assets".to_string(),
            default_stylesheet: DEFAULT_STYLE_TARGET.to_string(),
        }
    }
}

/// fenceguard configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub fence: FenceConfig,
    pub highlight: HighlightConfig,
    pub assets: AssetsConfig,
    /// Language names rewritten before highlighting (`html4strict = "html"`)
    pub language_aliases: BTreeMap<String, String>,
}

/// A configuration and the file it was read from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedConfig {
    pub config: Config,
    /// `None` when the defaults are used
    pub source: Option<PathBuf>,
}

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file at {path}: {source}")]
    IoError { source: io::Error, path: String },

    /// Failed to parse the configuration content
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// Configuration file already exists
    #[error("Configuration file already exists at {path}")]
    FileExists { path: String },

    /// The configuration parsed but holds an unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Parse and validate TOML configuration content
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError(message) => ConfigError::ParseError(format!("{}: {message}", path.display())),
            other => other,
        })
    }

    /// Load the configuration for this invocation.
    ///
    /// `no_config` wins over everything, then an explicit path, then discovery from the
    /// current directory. Without any file the defaults are used.
    pub fn load(explicit: Option<&Path>, no_config: bool) -> Result<LoadedConfig, ConfigError> {
        if no_config {
            log::debug!("[fenceguard-config] Skipping configuration files");
            return Ok(LoadedConfig::default());
        }

        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::current_dir().ok().and_then(|dir| discover_config_upward(&dir)),
        };

        match path {
            Some(path) => {
                log::debug!("[fenceguard-config] Loading {}", path.display());
                let config = Self::load_file(&path)?;
                Ok(LoadedConfig {
                    config,
                    source: Some(path),
                })
            }
            None => {
                log::debug!("[fenceguard-config] No configuration file found, using defaults");
                Ok(LoadedConfig::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let tag = &self.fence.tag;
        if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(ConfigError::Invalid(format!(
                "fence.tag must be a non-empty ASCII tag name, got '{tag}'"
            )));
        }
        if self.fence.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("fence.max-body-bytes must be positive".to_string()));
        }
        if self.highlight.default_style_target.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "highlight.default-style-target must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn grammar(&self) -> FenceGrammar {
        FenceGrammar::new(&self.fence.tag, self.fence.max_body_bytes)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            default_style_target: self.highlight.default_style_target.clone(),
            language_aliases: self
                .language_aliases
                .iter()
                .map(|(from, to)| (from.trim().to_lowercase(), to.clone()))
                .collect(),
            class_based: self.highlight.class_based,
        }
    }
}

/// Walk up from `start_dir` to the first directory holding a config file.
///
/// A directory containing `.git` is the last one searched.
pub fn discover_config_upward(start_dir: &Path) -> Option<PathBuf> {
    const MAX_DEPTH: usize = 100;

    let mut current_dir = start_dir.to_path_buf();
    for _ in 0..MAX_DEPTH {
        log::debug!("[fenceguard-config] Searching for config in: {}", current_dir.display());

        for config_name in CONFIG_FILES {
            let config_path = current_dir.join(config_name);
            if config_path.is_file() {
                log::debug!("[fenceguard-config] Found config file: {}", config_path.display());
                return Some(config_path);
            }
        }

        if current_dir.join(".git").exists() {
            log::debug!("[fenceguard-config] Stopping at .git directory");
            return None;
        }

        if !current_dir.pop() {
            log::debug!("[fenceguard-config] Reached filesystem root");
            return None;
        }
    }

    log::debug!("[fenceguard-config] Maximum traversal depth reached");
    None
}

/// JSON schema of the configuration file
pub fn json_schema() -> Result<String, ConfigError> {
    let schema = schemars::schema_for!(Config);
    serde_json::to_string_pretty(&schema).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Create a default configuration file at the specified path
pub fn create_default_config(path: &str) -> Result<(), ConfigError> {
    if Path::new(path).exists() {
        return Err(ConfigError::FileExists { path: path.to_string() });
    }

    let default_config = r#"# fenceguard configuration file

[fence]
# Tag name of fenced snippets: <pre lang="python" line="1">...</pre>
tag = "pre"
# Snippets larger than this are left unhighlighted
max-body-bytes = 1048576

[highlight]
# Run `fenceguard themes` for the available themes
theme = "InspiredGitHub"
# Wrapping containers for snippets without a cssfile/styleTarget attribute
default-style-target = "fenceguard"
# Emit CSS classes and one stylesheet per language instead of inline styles
class-based = true

[assets]
# Directory holding {style target}.css files, and the URL it is served under
dir = "assets"
url = "/assets"
default-stylesheet = "fenceguard"

# Language names rewritten before highlighting (uncomment and modify as needed)
[language-aliases]
# html4strict = "html"
# bash = "sh"
"#;

    fs::write(path, default_config).map_err(|source| ConfigError::IoError {
        source,
        path: path.to_string(),
    })
}
