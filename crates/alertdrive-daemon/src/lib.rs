//! alertdrive-daemon library.
//!
//! Exposes the daemon's state handle, HTTP handlers, and router so
//! integration tests can drive the API without binding a socket.

pub mod handlers;
pub mod server;
pub mod state;
