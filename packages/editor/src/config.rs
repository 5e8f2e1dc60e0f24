use serde::{Deserialize, Serialize};
use xedit_model::PLACEHOLDER_DOCUMENT;
use xedit_schema::Mode;

/// Per-session editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Display mode the session starts in
    #[serde(default)]
    pub mode: Mode,

    /// Language tag used to pick captions (`"en: Delete | de: Löschen"`)
    #[serde(default)]
    pub lang: String,

    /// Document substituted when the input does not parse
    #[serde(default = "default_placeholder_document")]
    pub placeholder_document: String,

    /// Arrow keys move the focus
    #[serde(default = "default_key_nav")]
    pub key_nav: bool,
}

fn default_placeholder_document() -> String {
    PLACEHOLDER_DOCUMENT.to_string()
}

fn default_key_nav() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            lang: String::new(),
            placeholder_document: default_placeholder_document(),
            key_nav: default_key_nav(),
        }
    }
}
