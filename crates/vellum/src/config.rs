//! Engine configuration.
//!
//! Every knob has a default matching the directive syntax, so most hosts use
//! `Config::default()`. The CLI loads overrides from JSON.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Name under which expressions see their own state scope, e.g. `_.count++`.
    pub self_name: String,
    /// Leading character marking bookkeeping fields that never trigger renders.
    pub meta_marker: char,
    /// Item variable of `v-for` when `v-for-item` is absent.
    pub default_item_name: String,
    /// Index variable of `v-for` when `v-for-index` is absent.
    pub default_index_name: String,
    /// Signal dispatched on a scope's element to request a render.
    pub render_signal: String,
    /// Signal dispatched on the bootstrap element once setup completes.
    pub mount_signal: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            self_name: "_".to_owned(),
            meta_marker: '$',
            default_item_name: "$item".to_owned(),
            default_index_name: "$index".to_owned(),
            render_signal: "render".to_owned(),
            mount_signal: "mount".to_owned(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|error| Error::structural(format!("invalid configuration: {error}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut chars = self.self_name.chars();
        let valid_self_name = matches!(chars.next(), Some(first) if first == '_' || first == '$' || first.is_ascii_alphabetic())
            && chars.all(|character| character == '_' || character == '$' || character.is_ascii_alphanumeric());
        if !valid_self_name {
            return Err(Error::structural(format!(
                "self name `{}` is not an identifier",
                self.self_name
            )));
        }
        if self.meta_marker.is_alphanumeric() {
            return Err(Error::structural(format!(
                "meta marker `{}` must not be alphanumeric",
                self.meta_marker
            )));
        }
        Ok(())
    }

    pub fn is_meta(&self, key: &str) -> bool {
        key.starts_with(self.meta_marker)
    }

    /// The character replaced by `-` in `:style` keys.
    pub(crate) fn style_dash(&self) -> Option<char> {
        let mut chars = self.self_name.chars();
        match (chars.next(), chars.next()) {
            (Some(character), None) => Some(character),
            _ => None,
        }
    }
}
