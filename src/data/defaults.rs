//! Property Defaults Profile
//!
//! Handles loading and saving the file-backed default values a client seeds
//! its configuration store from.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::properties::{PropertyError, PropertyId, PropertyKey, PropertyStore};

/// Default property values, persisted as a TOML `[properties]` table keyed
/// by canonical property names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsProfile {
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl DefaultsProfile {
    /// Get the default profile file path, next to the executable.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        exe_dir.join("properties.toml")
    }

    /// Load a profile from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading defaults profile {:?}", path))?;
        let profile: DefaultsProfile = toml::from_str(&content)
            .with_context(|| format!("parsing defaults profile {:?}", path))?;
        Ok(profile)
    }

    /// Load a profile from file, or create an empty one there.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let profile = DefaultsProfile::default();
            profile.save(path)?;
            Ok(profile)
        }
    }

    /// Save the profile to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("writing defaults profile {:?}", path))?;
        Ok(())
    }

    /// Set a default under the id's canonical name.
    pub fn set(&mut self, id: PropertyId, value: impl Into<String>) -> &mut Self {
        self.properties.insert(id.name().to_string(), value.into());
        self
    }

    /// Build a configuration store seeded with these defaults.
    ///
    /// Names that match a canonical id resolve to it and their values are
    /// validated; anything else is kept as a vendor-extension default and
    /// warned about.
    pub fn build_store(&self) -> Result<PropertyStore, PropertyError> {
        let mut defaults = BTreeMap::new();
        for (name, value) in &self.properties {
            let key = PropertyKey::parse(name);
            if matches!(key, PropertyKey::Custom(_)) {
                tracing::warn!(property = %name, "defaults profile names an unknown property");
            }
            defaults.insert(key, value.clone());
        }
        PropertyStore::with_defaults(defaults, BTreeSet::new())
    }
}
