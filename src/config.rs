use std::path::PathBuf;

use serde::Deserialize;

use crate::ipc;
use crate::source::installed;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub socket: SocketConfig,
    pub icons: IconConfig,
    pub presence: PresenceConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Socket path override; defaults to the per-user runtime directory.
    pub path: Option<PathBuf>,
}

impl SocketConfig {
    pub fn resolve_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(ipc::socket_path)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    /// Icon cache directory override.
    pub dir: Option<PathBuf>,
}

impl IconConfig {
    pub fn cache_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("roster-icons"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Append installed-but-not-running applications to the list.
    pub include_installed: bool,
    /// Directories scanned for .app bundles.
    pub app_dirs: Vec<PathBuf>,
    /// Workspace registry poll interval for lifecycle events.
    pub poll_interval_ms: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            include_installed: true,
            app_dirs: installed::DEFAULT_APP_DIRS.iter().map(PathBuf::from).collect(),
            poll_interval_ms: 500,
        }
    }
}

pub fn load() -> Config {
    let path = config_path();
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to parse config: {}, using defaults", e);
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config file: {}, using defaults", e);
            Config::default()
        }
    }
}

fn config_path() -> PathBuf {
    // Use ~/.config/ (XDG convention) instead of ~/Library/Application Support/ (macOS default)
    dirs::home_dir()
        .expect("Could not determine home directory")
        .join(".config")
        .join("roster")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.presence.include_installed);
        assert_eq!(config.presence.poll_interval_ms, 500);
        assert_eq!(config.presence.app_dirs.len(), installed::DEFAULT_APP_DIRS.len());
        assert_eq!(config.socket.path, None);
        assert_eq!(config.icons.dir, None);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: Config = toml::from_str(
            "[presence]\n\
             include_installed = false\n",
        )
        .unwrap();
        assert!(!config.presence.include_installed);
        assert_eq!(config.presence.poll_interval_ms, 500);
    }

    #[test]
    fn overrides_are_honored() {
        let config: Config = toml::from_str(
            "[socket]\n\
             path = \"/tmp/test-roster.sock\"\n\
             \n\
             [icons]\n\
             dir = \"/tmp/test-icons\"\n\
             \n\
             [presence]\n\
             app_dirs = [\"/opt/apps\"]\n\
             poll_interval_ms = 100\n",
        )
        .unwrap();
        assert_eq!(config.socket.resolve_path(), PathBuf::from("/tmp/test-roster.sock"));
        assert_eq!(config.icons.cache_dir(), PathBuf::from("/tmp/test-icons"));
        assert_eq!(config.presence.app_dirs, vec![PathBuf::from("/opt/apps")]);
        assert_eq!(config.presence.poll_interval_ms, 100);
    }
}
