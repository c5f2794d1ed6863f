// Consumer side of the terminal streaming protocol
//
// Connects to a termbridge server's event stream, decodes the framed
// events, and keeps the subscription alive across transport failures with
// bounded exponential backoff. The embedding UI receives decoded events and
// state transitions over a channel; what it renders for each transition is
// its own business.

mod client;
mod events;
mod sse;
mod state;

pub use client::{ClientConfig, ClientError, ClientUpdate, TerminalClient};
pub use events::TerminalEvent;
pub use sse::{SseDecoder, SseFrame};
pub use state::{ConnectionState, ReconnectPolicy, ReconnectState};
