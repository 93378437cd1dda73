//! Module: config
//! Responsibility: mapping and manager configuration, loadable from TOML.
//!
//! ```toml
//! tag_prefix = "persistent-"
//! cache_region = "app"
//!
//! [[source_roots]]
//! path = "src/model"
//! namespace = "app::model"
//!
//! [driver]
//! public_property_auto_mapping = true
//! lifecycle_method_auto_mapping = false
//!
//! [listeners]
//! event_manager = false
//! ```


use crate::event::InvokeMask;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

pub const DEFAULT_TAG_PREFIX: &str = "persistent-";

///
/// ConfigError
///

#[derive(Debug, ThisError)]
#[remain::sorted]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

///
/// SourceRoot
///
/// Directory of declarations and the module path its files live under.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SourceRoot {
    pub path: PathBuf,

    #[serde(default)]
    pub namespace: String,
}

impl SourceRoot {
    pub fn new(path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.into(),
        }
    }
}

///
/// DriverFlags
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct DriverFlags {
    /// Map public fields that carry no tag as plain fields.
    pub public_property_auto_mapping: bool,

    /// Register public methods named after lifecycle events as callbacks.
    pub lifecycle_method_auto_mapping: bool,

    /// Visit the parent's declared fields as part of the child.
    pub embed_parent: bool,

    /// Resolve association targets by local type name when unambiguous.
    pub association_target_short_name: bool,
}

///
/// Configuration
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Configuration {
    pub source_roots: Vec<SourceRoot>,
    pub tag_prefix: String,
    pub driver: DriverFlags,
    pub cache_region: Option<String>,
    pub listeners: InvokeMask,
}

impl Configuration {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&text)
    }

    #[must_use]
    pub fn with_source_root(mut self, root: SourceRoot) -> Self {
        self.source_roots.push(root);
        self
    }

    #[must_use]
    pub const fn with_driver_flags(mut self, driver: DriverFlags) -> Self {
        self.driver = driver;
        self
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            source_roots: Vec::new(),
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
            driver: DriverFlags::default(),
            cache_region: None,
            listeners: InvokeMask::ALL,
        }
    }
}
