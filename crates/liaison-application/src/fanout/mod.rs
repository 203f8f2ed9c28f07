//! Real-time fan-out of committed actions.
//!
//! # Module Structure
//!
//! - `registry`: user -> live channel mapping (`SessionRegistry`)
//! - `bus`: publish path (`EventBus`)
//! - `stream`: per-session receiving end (`SessionStream`)
//!
//! Channels are bounded broadcast channels. Capacity is rounded up to a power
//! of two by the channel implementation.

mod bus;
mod registry;
mod stream;

pub use bus::EventBus;
pub use registry::SessionRegistry;
pub use stream::SessionStream;
