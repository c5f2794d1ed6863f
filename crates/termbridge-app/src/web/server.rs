use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use colored::Colorize;
use tower_http::cors::{Any, CorsLayer};

use termbridge_terminal::{
    CommandChannel, ProcessFactory, PtyProcessFactory, SessionRegistry, ShellConfig,
};

use crate::web::routes::{self, AppState};

/// Web server configuration
pub struct WebServerConfig {
    pub bind_addr: SocketAddr,
    pub shell: ShellConfig,
    pub keepalive: Duration,
    pub max_sessions: usize,
}

/// Web server instance
pub struct WebServer {
    config: WebServerConfig,
    registry: Arc<SessionRegistry>,
    commands: Arc<CommandChannel>,
}

impl WebServer {
    /// Create a new web server backed by real PTY sessions.
    pub fn new(config: WebServerConfig) -> Self {
        Self::with_factory(config, Arc::new(PtyProcessFactory))
    }

    /// Create a web server with a custom process factory.
    pub fn with_factory(config: WebServerConfig, factory: Arc<dyn ProcessFactory>) -> Self {
        let registry = Arc::new(SessionRegistry::with_limit(factory, config.max_sessions));
        let commands = Arc::new(CommandChannel::new(Arc::clone(&registry)));

        Self {
            config,
            registry,
            commands,
        }
    }

    /// Get the session registry (for embedding or tests).
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Build the router with CORS enabled for development.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            commands: Arc::clone(&self.commands),
            shell: self.config.shell.clone(),
            keepalive: self.config.keepalive,
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        routes::create_router(state).layer(cors)
    }

    /// Start the web server
    pub async fn start(self) -> Result<()> {
        let app = self.router();

        println!(
            "{}",
            format!("🖥️  Terminal server starting on http://{}", self.config.bind_addr).bright_cyan()
        );
        println!(
            "   Stream endpoint: http://{}/api/terminal?sessionId={{id}}",
            self.config.bind_addr
        );
        println!(
            "   Command endpoint: POST http://{}/api/terminal",
            self.config.bind_addr
        );

        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
