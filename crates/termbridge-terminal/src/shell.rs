use std::path::PathBuf;

use crate::{DEFAULT_COLS, DEFAULT_ROWS};

/// Configuration used when spawning the shell process behind a session.
///
/// All fields are optional; unset fields fall back to the platform default
/// shell, the service's working directory, and an 80x24 terminal. The config
/// only matters on first spawn; a session that is already live keeps the
/// geometry it was created with.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Shell binary to launch. `None` selects the platform default.
    pub command: Option<String>,
    /// Working directory for the spawned shell.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables set on the child.
    pub env: Vec<(String, String)>,
    pub cols: u16,
    pub rows: u16,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: None,
            working_dir: None,
            env: Vec::new(),
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }
}

impl ShellConfig {
    /// Resolve the shell command, falling back to the platform default.
    pub fn resolve_command(&self) -> String {
        self.command.clone().unwrap_or_else(default_shell)
    }
}

/// Returns the platform default shell.
fn default_shell() -> String {
    if cfg!(windows) {
        "cmd.exe".to_string()
    } else {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string())
    }
}
