use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use termbridge::cli::Cli;
use termbridge::web::{WebServer, WebServerConfig};
use termbridge_terminal::ShellConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let config = WebServerConfig {
        bind_addr: cli.bind,
        shell: ShellConfig {
            command: cli.shell,
            working_dir: cli.working_dir,
            env: Vec::new(),
            cols: cli.cols,
            rows: cli.rows,
        },
        keepalive: Duration::from_secs(cli.keepalive_secs),
        max_sessions: cli.max_sessions,
    };

    WebServer::new(config).start().await
}
