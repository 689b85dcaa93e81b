//! Default file locations.
//!
//! The configuration and log files live in the platform config and data
//! directories. When those cannot be determined (no home directory), files
//! are placed next to the executable.

use std::path::{Path, PathBuf};

use directories::{ProjectDirs, UserDirs};

/// Name of the settings document.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Name of the append-only event log.
pub const LOG_FILE_NAME: &str = "send_log.txt";

/// Name of the default source directory.
pub const EBOOKS_DIR_NAME: &str = "Ebooks";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "kindle-courier", "kindle-courier")
}

/// Directory containing the running executable, or the working directory.
pub fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default location of the settings document.
pub fn default_config_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(executable_dir)
        .join(CONFIG_FILE_NAME)
}

/// Default location of the event log.
pub fn default_log_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(executable_dir)
        .join(LOG_FILE_NAME)
}

/// Default source directory, `Ebooks` under the user's documents folder.
pub fn default_ebooks_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
        .unwrap_or_else(executable_dir)
        .join(EBOOKS_DIR_NAME)
}
