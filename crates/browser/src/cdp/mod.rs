//! CDP (Chrome DevTools Protocol) Client Implementation
//!
//! Single WebSocket connection, multiplexed sessions.

pub mod client;
pub mod protocol;
pub mod session;

pub use client::{CDPClient, CDPError};
pub use protocol::{CDPEvent, CDPRequest, CDPResponse};
pub use session::CDPSession;
