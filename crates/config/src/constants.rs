//! Fixed values shared by the remote client and server
//!
//! A debug-mode peer must be reachable without any shared configuration.

/// Socket name used when none is configured in debug mode
pub const DEFAULT_SOCKET: &str = "rivet_installer_socket";

/// Authorization key accepted by debug-mode servers
pub const DEFAULT_AUTHORIZATION_KEY: &str = "DefaultAuthorizationKey";

/// Settings root for system-scope `GlobalConfig` writes
pub const SYSTEM_SETTINGS_DIR: &str = "/etc/xdg";

/// File name of the speed-dial kit list
pub const SPEED_DIAL_FILE: &str = "SpeedDialKits.xml";

/// Default extension of kit description files
pub const KIT_EXTENSION: &str = "kit";
