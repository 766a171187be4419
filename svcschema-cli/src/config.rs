//! CLI configuration, read from `svcschema.toml`.
//!
//! ```toml
//! [store]
//! path = "svcschema.db"
//!
//! [engine]
//! actor = "participant"
//! disabled_validators = ["pattern"]
//! ```
//!
//! Every key is optional. A missing or unreadable file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use svcschema_engine::Engine;
use svcschema_types::ActorKind;
use tracing::{debug, info, warn};

/// Where the SQLite store lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("svcschema.db")
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// How requests are evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSection {
    /// Actor assumed when the command line names none.
    #[serde(default = "default_actor")]
    pub actor: ActorKind,
    /// Built-in validators to drop from the registry.
    #[serde(default)]
    pub disabled_validators: Vec<String>,
}

fn default_actor() -> ActorKind {
    ActorKind::Participant
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            actor: default_actor(),
            disabled_validators: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub engine: EngineSection,
}

impl CliConfig {
    /// Loads the config at `path`, falling back to defaults with a log line
    /// when the file is missing or malformed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<CliConfig>(&contents) {
                Ok(config) => {
                    info!("Loaded config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse config file {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// An engine with the built-ins minus any disabled validators.
    pub fn engine(&self) -> Engine {
        let mut builder = Engine::builder();
        for name in &self.engine.disabled_validators {
            debug!("Disabling validator {}", name);
            builder = builder.without_validator(name);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: CliConfig = toml::from_str("").unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.store.path, PathBuf::from("svcschema.db"));
        assert_eq!(config.engine.actor, ActorKind::Participant);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: CliConfig = toml::from_str("[engine]\nactor = \"admin\"\n").unwrap();
        assert_eq!(config.engine.actor, ActorKind::Admin);
        assert!(config.engine.disabled_validators.is_empty());
        assert_eq!(config.store, StoreSection::default());
    }
}
