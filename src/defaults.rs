//! Default locations shared by the commands.

use std::path::PathBuf;

/// File name of the configuration file.
pub const DEFAULT_CONFIG_FILENAME: &str = "nodesync.yaml";

/// Returns the default configuration file path.
///
/// Uses the platform configuration directory:
/// - Linux: `~/.config/nodesync/nodesync.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/nodesync/nodesync.yaml`
///
/// Falls back to `nodesync.yaml` in the current directory if the platform
/// directory cannot be determined. Overridden by `--config` or the
/// `NODESYNC_CONFIG` environment variable.
pub fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("nodesync").join(DEFAULT_CONFIG_FILENAME),
        None => PathBuf::from(DEFAULT_CONFIG_FILENAME),
    }
}

/// Directory template generators write into when the configuration does
/// not name one.
pub fn default_tempdir() -> PathBuf {
    std::env::temp_dir().join("nodesync")
}
