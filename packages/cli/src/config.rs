use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use xedit_editor::EditorConfig;

pub const DEFAULT_CONFIG_NAME: &str = "xedit.config.json";

/// Xedit configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// docSpec used when a command is not given one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,

    /// Default tracing filter when RUST_LOG is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Editor session settings
    #[serde(default)]
    pub editor: EditorConfig,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// The docSpec to use: the one given on the command line, else the
    /// configured one, resolved against `cwd`
    pub fn spec_path(&self, cwd: &str, given: Option<&PathBuf>) -> Option<PathBuf> {
        given
            .cloned()
            .or_else(|| self.spec.as_ref().map(|s| PathBuf::from(cwd).join(s)))
    }
}
