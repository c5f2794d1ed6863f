// Web service module
pub mod protocol;
pub mod routes;
pub mod server;
pub mod stream;

pub use protocol::{CommandAck, CommandBody, ServerEvent};
pub use routes::{create_router, AppState};
pub use server::{WebServer, WebServerConfig};
