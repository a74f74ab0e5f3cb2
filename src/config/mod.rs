use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::protocol::PlayerInfo;

mod defaults;
pub use defaults::*;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Connection tuning
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Known servers
    #[serde(default)]
    pub servers: Vec<ServerEntry>,

    /// Favorite commands surfaced as one-shot buttons
    #[serde(default)]
    pub favorites: Vec<FavoriteCommandEntry>,

    /// Per-player command templates
    #[serde(default)]
    pub player_commands: Vec<PlayerCommandEntry>,
}

/// Connection tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// How long to wait for the socket to open, in seconds
    pub connect_timeout_secs: u64,

    /// Capacity of the session event channel
    pub event_buffer: usize,
}

/// A known server console
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Display name
    pub name: String,

    /// `host:port` of the telnet console
    pub address: String,

    /// Whether this was the most recently used entry
    #[serde(default)]
    pub last_used: bool,
}

impl ServerEntry {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            last_used: false,
        }
    }
}

/// A favorite command bound to a one-shot button
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteCommandEntry {
    /// Button label
    pub label: String,

    /// Command text sent verbatim
    pub command: String,
}

/// A command template applied to a selected player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerCommandEntry {
    /// Menu entry name
    pub name: String,

    /// Template with `{name}`, `{ip}` and `{uuid}` placeholders
    pub template: String,
}

impl PlayerCommandEntry {
    /// Expand the template against a player record
    pub fn build_command(&self, player: &PlayerInfo) -> String {
        self.template
            .replace("{name}", &player.name)
            .replace("{ip}", &player.ip)
            .replace("{uuid}", &player.uuid)
    }
}

/// Load configuration from a file
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<ClientConfig> {
    // If the file doesn't exist, create it with default values
    if !path.as_ref().exists() {
        let default_config = ClientConfig::default();
        save_config(&path, &default_config).await?;
        return Ok(default_config);
    }

    // Read and parse the config file
    let content = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
}

/// Save configuration to a file
pub async fn save_config<P: AsRef<Path>>(path: P, config: &ClientConfig) -> Result<()> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let content = toml::to_string_pretty(config).with_context(|| "Failed to serialize config")?;

    fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            servers: Vec::new(),
            favorites: Vec::new(),
            player_commands: DEFAULT_PLAYER_COMMANDS
                .iter()
                .map(|(name, template)| PlayerCommandEntry {
                    name: name.to_string(),
                    template: template.to_string(),
                })
                .collect(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_materializes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_config(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(
            config.connection.connect_timeout_secs,
            DEFAULT_CONNECT_TIMEOUT_SECS
        );
        assert!(!config.player_commands.is_empty());
    }

    #[tokio::test]
    async fn config_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ClientConfig::default();
        config.servers.push(ServerEntry {
            name: "local".to_string(),
            address: "127.0.0.1:8765".to_string(),
            last_used: true,
        });
        config.favorites.push(FavoriteCommandEntry {
            label: "List".to_string(),
            command: "list".to_string(),
        });

        save_config(&path, &config).await.unwrap();
        let loaded = load_config(&path).await.unwrap();

        assert_eq!(loaded.servers.len(), 1);
        assert_eq!(loaded.servers[0].address, "127.0.0.1:8765");
        assert!(loaded.servers[0].last_used);
        assert_eq!(loaded.favorites[0].command, "list");
        assert_eq!(loaded.player_commands.len(), config.player_commands.len());
    }

    #[test]
    fn player_command_templates_substitute_placeholders() {
        let mut player = PlayerInfo::joined("Bob", "1.2.3.4");
        player.uuid = "u-123".to_string();

        let kick = PlayerCommandEntry {
            name: "Kick".to_string(),
            template: "kick {name}".to_string(),
        };
        assert_eq!(kick.build_command(&player), "kick Bob");

        let ban_ip = PlayerCommandEntry {
            name: "Ban IP".to_string(),
            template: "ban-ip {ip} ({name}/{uuid})".to_string(),
        };
        assert_eq!(ban_ip.build_command(&player), "ban-ip 1.2.3.4 (Bob/u-123)");
    }
}
