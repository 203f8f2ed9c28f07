//! Infrastructure layer: stores, ledger, configuration and paths.

pub mod config_service;
pub mod identity;
pub mod journal_interaction_store;
pub mod memory_interaction_store;
pub mod memory_ledger;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::identity::StaticIdentityProvider;
pub use crate::journal_interaction_store::JournalInteractionStore;
pub use crate::memory_interaction_store::InMemoryInteractionStore;
pub use crate::memory_ledger::{InMemoryLedger, LedgerSnapshot, LedgerSnapshotFile};
pub use crate::paths::LiaisonPaths;
