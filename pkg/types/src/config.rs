use serde::{Deserialize, Serialize};

/// Agent configuration file (YAML).
///
/// Example `config.yaml`:
/// ```yaml
/// hub-data-dir: /var/lib/authsync/hub
/// spoke-data-dir: /var/lib/authsync/spoke
/// resync-interval-secs: 30
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfigFile {
    #[serde(default, alias = "hub-data-dir")]
    pub hub_data_dir: Option<String>,
    #[serde(default, alias = "spoke-data-dir")]
    pub spoke_data_dir: Option<String>,
    #[serde(default, alias = "resync-interval-secs")]
    pub resync_interval_secs: Option<u64>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}
