use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// CLI arguments for the termbridge server
#[derive(Parser)]
#[command(name = "termbridge")]
#[command(about = "Terminal session server - persistent shell sessions streamed to web clients")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Address to bind the web server on
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:3001")]
    pub bind: SocketAddr,

    /// Shell binary for new sessions (defaults to the platform shell)
    #[arg(long, value_name = "PATH")]
    pub shell: Option<String>,

    /// Working directory for new sessions
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Seconds between keepalive comments on idle streams
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub keepalive_secs: u64,

    /// Maximum number of concurrent sessions
    #[arg(long, value_name = "N", default_value_t = termbridge_terminal::MAX_CONCURRENT_SESSIONS)]
    pub max_sessions: usize,

    /// Default terminal width for new sessions
    #[arg(long, value_name = "COLS", default_value_t = termbridge_terminal::DEFAULT_COLS)]
    pub cols: u16,

    /// Default terminal height for new sessions
    #[arg(long, value_name = "ROWS", default_value_t = termbridge_terminal::DEFAULT_ROWS)]
    pub rows: u16,
}
