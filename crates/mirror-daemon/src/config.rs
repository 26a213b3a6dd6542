//! Daemon configuration, loaded from a YAML file.
//!
//! Access tokens never live in the file itself; each source names an
//! environment variable (`token_env`) the token is read from at startup.
//! OAuth flows and token refresh are outside this daemon.

use anyhow::{bail, Context, Result};
use mirror_core::{ConflictPolicy, ContainerRef, ScopeMapping, SourceKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_poll_interval() -> u64 {
    300
}

fn default_shutdown_grace() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory snapshot partitions are persisted under.
    pub state_dir: PathBuf,
    /// Upper bound on waiting for in-flight passes at shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    /// The mirrored service everything is consolidated into.
    pub mirror: MirrorConfig,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorConfig {
    pub base_url: String,
    pub token_env: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    pub base_url: Option<String>,
    pub token_env: String,
    pub mappings: Vec<MappingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    /// Native list/category ID (or name, for platforms addressed by name).
    pub list: String,
    /// Mirrored container name; the literal `inbox` means the default
    /// container.
    pub container: String,
    #[serde(default)]
    pub include_completed: bool,
    #[serde(default)]
    pub delete_after_sync: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Drop remote items assigned to other users (bi-directional sources).
    #[serde(default)]
    pub filter_assignee: bool,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

impl MappingConfig {
    pub fn to_scope(&self) -> ScopeMapping {
        ScopeMapping {
            list_id: self.list.clone(),
            container: ContainerRef::parse(&self.container),
            include_completed: self.include_completed,
            delete_after_sync: self.delete_after_sync,
            tags: self.tags.clone(),
            filter_assignee: self.filter_assignee,
            conflict_policy: self.conflict_policy,
        }
    }
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("no sources configured");
        }
        for source in &self.sources {
            if source.mappings.is_empty() {
                bail!("source {} has no mappings", source.kind);
            }
            if source.poll_interval_secs == 0 {
                bail!("source {} has a zero poll interval", source.kind);
            }
            for mapping in &source.mappings {
                if mapping.delete_after_sync && source.kind.is_bidirectional() {
                    bail!(
                        "delete_after_sync is not valid for bi-directional source {}",
                        source.kind
                    );
                }
            }
        }
        Ok(())
    }

    /// Read a source's access token from its configured environment variable.
    pub fn token_for(token_env: &str) -> Result<String> {
        std::env::var(token_env)
            .with_context(|| format!("token environment variable {token_env} is not set"))
    }
}
