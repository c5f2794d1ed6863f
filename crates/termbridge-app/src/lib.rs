// termbridge server library
//
// Hosts the terminal session registry behind two HTTP surfaces: a long-lived
// event stream per observer (read path) and a JSON command endpoint (write
// path), plus small session admin routes.

pub mod cli;
pub mod web;

pub use cli::Cli;
pub use web::{WebServer, WebServerConfig};
