use super::types::{
    CollabConfig, DEFAULT_HOST, DEFAULT_PORT, RawCollabConfig, RawServerConfig,
    RawSessionConfig, ServerSection, SessionSection,
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the project config directory
pub const PROJECT_CONFIG_DIR_ENV: &str = "COLLAB_PROJECT_CONFIG_DIR";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<CollabConfig> {
        let mut raw = RawCollabConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "collab").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with COLLAB_PROJECT_CONFIG_DIR (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var(PROJECT_CONFIG_DIR_ENV) {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".collab/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawCollabConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("invalid config in {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawCollabConfig, overlay: RawCollabConfig) -> RawCollabConfig {
        RawCollabConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            session: RawSessionConfig {
                grace_window_secs: overlay
                    .session
                    .grace_window_secs
                    .or(base.session.grace_window_secs),
                relay_policy: overlay.session.relay_policy.or(base.session.relay_policy),
                outbound_buffer: overlay
                    .session
                    .outbound_buffer
                    .or(base.session.outbound_buffer),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawCollabConfig) -> CollabConfig {
        let defaults = SessionSection::default();
        CollabConfig {
            server: ServerSection {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
            },
            session: SessionSection {
                grace_window_secs: raw
                    .session
                    .grace_window_secs
                    .unwrap_or(defaults.grace_window_secs),
                relay_policy: raw.session.relay_policy.unwrap_or(defaults.relay_policy),
                outbound_buffer: raw
                    .session
                    .outbound_buffer
                    .unwrap_or(defaults.outbound_buffer),
            },
        }
    }

    /// Write config to a specific path, creating parent directories
    ///
    /// Refuses to replace an existing file unless `overwrite` is set.
    pub fn save_to_path(config: &CollabConfig, path: &Path, overwrite: bool) -> Result<()> {
        if path.exists() && !overwrite {
            anyhow::bail!("{} already exists", path.display());
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(config)?;
        std::fs::write(path, toml)?;

        Ok(())
    }

    /// Load config from a specific path (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<CollabConfig> {
        if path.exists() {
            Ok(Self::finalize(Self::read_raw(path)?))
        } else {
            Ok(CollabConfig::default())
        }
    }
}
