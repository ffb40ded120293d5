use std::path::PathBuf;

use directories::ProjectDirs;

/// Directory holding the SQLite database and other runtime assets.
///
/// Overridable with `TODO_AGENT_DATA_DIR` so deployments can pin the
/// location; otherwise the platform data dir is used.
pub fn asset_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TODO_AGENT_DATA_DIR") {
        return PathBuf::from(dir);
    }
    ProjectDirs::from("ai", "todo-agent", "todo-agent")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
