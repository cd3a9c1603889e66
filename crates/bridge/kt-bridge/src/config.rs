//! Bridge configuration files

use crate::registry::MacroTypeIdentity;
use anyhow::{Context, Result, bail};
use kt_macro::builtin_descriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bridge configuration (e.g., `kite-bridge.toml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Expansion behavior
    #[serde(default)]
    pub expansion: ExpansionConfig,

    /// Extra identities mapped to builtin implementations
    #[serde(default)]
    pub macros: Vec<MacroEntry>,
}

/// How expansions run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Turn panics in macro implementations into error diagnostics
    #[serde(default = "default_true")]
    pub catch_panics: bool,

    /// Append the originating macro's name to relayed diagnostics
    #[serde(default = "default_true")]
    pub annotate_macro_name: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            catch_panics: true,
            annotate_macro_name: true,
        }
    }
}

/// `[[macros]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroEntry {
    /// Module of the macro type
    pub module: String,

    /// Name of the macro type
    #[serde(rename = "type")]
    pub type_name: String,

    /// Builtin implementation backing the type
    pub builtin: String,
}

impl MacroEntry {
    /// The identity the entry registers
    pub fn identity(&self) -> MacroTypeIdentity {
        MacroTypeIdentity::new(&self.module, &self.type_name)
    }
}

impl BridgeConfig {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML or
    /// fails [`BridgeConfig::validate`]
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bridge config: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to load bridge config: {}", path.display()))
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails
    /// [`BridgeConfig::validate`]
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse bridge config")?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every `[[macros]]` entry names a known builtin
    ///
    /// # Errors
    ///
    /// Returns an error naming the first entry with an unknown builtin
    pub fn validate(&self) -> Result<()> {
        for entry in &self.macros {
            if builtin_descriptor(&entry.builtin).is_none() {
                bail!("macro `{}` maps to unknown builtin `{}`", entry.identity(), entry.builtin);
            }
        }
        Ok(())
    }
}
