//! Filesystem path constants.

/// Default config file path for the agent.
pub const DEFAULT_AGENT_CONFIG: &str = "/etc/authsync/config.yaml";

/// Default data directory for the hub state store.
pub const DEFAULT_HUB_DATA_DIR: &str = "/tmp/authsync-hub-data";

/// Default data directory for the spoke state store.
pub const DEFAULT_SPOKE_DATA_DIR: &str = "/tmp/authsync-spoke-data";
