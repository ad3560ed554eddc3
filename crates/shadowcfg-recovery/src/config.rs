use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shadowcfg_checksum::{ChecksumAlgorithm, Ledger, DEFAULT_SUFFIX};
use shadowcfg_snapshot::{SnapshotPaths, SyncMode};

use crate::error::ConfigError;

/// Store-wide settings plus the list of managed configuration names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Writable directory holding the snapshots.
    pub config_dir: PathBuf,
    /// Read-only directory holding the factory `<name>.orig` files.
    pub readonly_dir: PathBuf,
    pub checksum: ChecksumAlgorithm,
    pub sidecar_suffix: String,
    pub sync: SyncMode,
    /// Overwrite the local `orig` whenever the read-only copy differs.
    pub sync_orig_from_readonly: bool,
    /// Context lines recorded around each edit in a merge patch.
    pub context_lines: usize,
    pub managed: Vec<ManagedConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("/etc/shadowcfg"),
            readonly_dir: PathBuf::from("/rom/etc/shadowcfg"),
            checksum: ChecksumAlgorithm::default(),
            sidecar_suffix: DEFAULT_SUFFIX.to_string(),
            sync: SyncMode::default(),
            sync_orig_from_readonly: true,
            context_lines: shadowcfg_merge::TextPatchStrategy::default().context(),
            managed: Vec::new(),
        }
    }
}

/// One managed configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagedConfig {
    pub name: String,
    /// Optional names without a read-only factory copy are skipped.
    #[serde(default = "default_optional")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly_dir: Option<PathBuf>,
}

fn default_optional() -> bool {
    true
}

impl ManagedConfig {
    /// An optional name using the store-wide directories.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
            config_dir: None,
            readonly_dir: None,
        }
    }

    /// Fail the pass for this name when no factory default can be found.
    pub fn required(mut self) -> Self {
        self.optional = false;
        self
    }
}

impl StoreConfig {
    /// Defaults with the given directories and no managed names.
    pub fn new(config_dir: impl Into<PathBuf>, readonly_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            readonly_dir: readonly_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_managed(mut self, managed: ManagedConfig) -> Self {
        self.managed.push(managed);
        self
    }

    /// Read and validate a TOML file. Relative directories are taken
    /// relative to the file's own directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&text)?;
        config.rebase_paths(path.parent().unwrap_or_else(|| Path::new(".")));
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject names that cannot be used as file stems, duplicates and an
    /// unusable sidecar suffix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sidecar_suffix.is_empty() || self.sidecar_suffix.contains('/') {
            return Err(ConfigError::InvalidSuffix(self.sidecar_suffix.clone()));
        }
        let mut seen = HashSet::new();
        for managed in &self.managed {
            if !is_valid_name(&managed.name) {
                return Err(ConfigError::InvalidName(managed.name.clone()));
            }
            if !seen.insert(managed.name.as_str()) {
                return Err(ConfigError::DuplicateName(managed.name.clone()));
            }
        }
        Ok(())
    }

    pub fn managed(&self, name: &str) -> Option<&ManagedConfig> {
        self.managed.iter().find(|m| m.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.managed.iter().map(|m| m.name.as_str())
    }

    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.checksum, self.sidecar_suffix.clone())
    }

    /// Resolve the snapshot layout of one name, honouring its overrides.
    pub fn paths_for(&self, managed: &ManagedConfig) -> SnapshotPaths {
        SnapshotPaths::new(
            &managed.name,
            managed.config_dir.as_deref().unwrap_or(&self.config_dir),
            managed.readonly_dir.as_deref().unwrap_or(&self.readonly_dir),
        )
    }

    fn rebase_paths(&mut self, base: &Path) {
        rebase(base, &mut self.config_dir);
        rebase(base, &mut self.readonly_dir);
        for managed in &mut self.managed {
            for dir in [&mut managed.config_dir, &mut managed.readonly_dir].into_iter().flatten() {
                rebase(base, dir);
            }
        }
    }
}

fn rebase(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
}
