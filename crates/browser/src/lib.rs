//! Host side of interaction-tree extraction
//!
//! Connects to a page over the Chrome DevTools Protocol, runs the snapshot
//! and tagging scripts, and dispatches native input against elements
//! addressed by the identifiers `interact-dom` hands out.
//!
//! ```text
//! CDPClient ─ CDPSession (PageHandle) ─ InteractionSession
//!                                         ├─ extract()      snapshot → Extractor → tag
//!                                         └─ click(id) ...  locate by marker → Input.*
//! ```

pub mod cdp;
pub mod error;
pub mod interaction;
pub mod page;
pub mod scripts;

pub use cdp::{CDPClient, CDPError, CDPSession};
pub use error::ActionError;
pub use interaction::{InteractionSession, SessionConfig};
pub use page::PageHandle;
