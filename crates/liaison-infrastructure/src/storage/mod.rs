//! File-backed storage primitives.
//!
//! - `atomic_toml`: whole-file TOML documents replaced atomically (config, ledger snapshot)
//! - `journal`: append-only JSON-lines event journal

mod atomic_toml;
mod journal;

pub use atomic_toml::{AtomicTomlError, AtomicTomlFile};
pub use journal::Journal;
