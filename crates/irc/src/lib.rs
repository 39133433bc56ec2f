//! IRC bridge adapter: a minimal RFC 1459 client over tokio, speaking just
//! enough of the protocol to sit in one channel and relay both ways.

mod bridge;
mod error;
mod proto;
mod session;
mod tls;

pub use {bridge::IrcBridge, error::Error};
