//! Driftcast Web - HTTP serving for the live stream
//!
//! Exposes the chunk fan-out as a chunked HTTP body per listener, plus a
//! JSON status endpoint. The pump never sees any of this; listeners attach
//! and detach purely through broadcast subscriptions.

pub mod handlers;
pub mod server;

pub use server::{AppState, router, run_server};
