//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clanforge_transport::DEFAULT_MAX_FRAME_LEN;
use serde::{Deserialize, Serialize};

use crate::ClanforgeError;

/// Settings for one server process.
///
/// Every field has a default, so a config file only needs the keys it
/// changes:
///
/// ```json
/// { "bindAddr": "127.0.0.1:9000", "clanFile": "clans.json" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Where the clan table is persisted. `None` keeps it in memory.
    pub clan_file: Option<PathBuf>,
    /// Period of the background matchmaking pass.
    pub match_interval_ms: u64,
    pub war_duration_secs: u64,
    /// Period of the expired-war sweep.
    pub war_sweep_interval_ms: u64,
    pub max_frame_len: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8888".to_string(),
            clan_file: None,
            match_interval_ms: 1000,
            war_duration_secs: 24 * 60 * 60,
            war_sweep_interval_ms: 5000,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ServerConfig {
    /// Reads a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClanforgeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ClanforgeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ClanforgeError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn match_interval(&self) -> Duration {
        Duration::from_millis(self.match_interval_ms.max(1))
    }

    pub fn war_duration(&self) -> Duration {
        Duration::from_secs(self.war_duration_secs)
    }

    pub fn war_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.war_sweep_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_matches_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8888");
        assert_eq!(config.clan_file, None);
        assert_eq!(config.match_interval(), Duration::from_secs(1));
        assert_eq!(config.war_duration(), Duration::from_secs(86_400));
        assert_eq!(config.war_sweep_interval(), Duration::from_secs(5));
        assert_eq!(config.max_frame_len, 16 * 1024 * 1024);
    }

    #[test]
    fn test_from_file_partial_keys_keep_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "bindAddr": "127.0.0.1:9000", "warDurationSecs": 60 }}"#).unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.war_duration_secs, 60);
        assert_eq!(config.match_interval_ms, 1000);
    }

    #[test]
    fn test_from_file_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::from_file(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ClanforgeError::ConfigRead { .. }));
    }

    #[test]
    fn test_from_file_bad_json_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = ServerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ClanforgeError::ConfigParse { .. }));
    }
}
