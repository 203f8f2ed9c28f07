pub mod config;
pub mod interact;
pub mod ledger;
pub mod query;
pub mod watch;

use anyhow::{Context, Result};
use liaison_application::Coordinator;
use liaison_core::config::CoreConfig;
use liaison_infrastructure::{
    ConfigService, InMemoryLedger, JournalInteractionStore, LedgerSnapshotFile, LiaisonPaths,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs: the coordinator over the durable data
/// directory, plus the ledger snapshot it must write back.
pub struct Workspace {
    pub coordinator: Coordinator,
    ledger: Arc<InMemoryLedger>,
    ledger_file: LedgerSnapshotFile,
}

impl Workspace {
    /// Loads configuration, replays the journal and restores the ledger,
    /// reconciled against the journal.
    pub async fn open(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self> {
        let config = load_config(config_path)?;
        let storage = match data_dir {
            Some(dir) => {
                let mut storage = config.storage.clone();
                storage.data_dir = Some(dir);
                storage
            }
            None => config.storage.clone(),
        };

        let journal_path = LiaisonPaths::journal_file(&storage)?;
        let store = JournalInteractionStore::open(&journal_path)
            .await
            .with_context(|| format!("Failed to open journal {}", journal_path.display()))?;

        let ledger_file = LedgerSnapshotFile::new(LiaisonPaths::ledger_file(&storage)?);
        let ledger = ledger_file
            .load()
            .with_context(|| format!("Failed to load ledger {}", ledger_file.path().display()))?;

        // The journal is written before the snapshot; debits a crashed run
        // never saved are re-applied from it.
        let adjusted = ledger
            .reconcile_usage(&store.charged_by_actor())
            .context("Ledger snapshot disagrees with the journal")?;
        if !adjusted.is_empty() {
            tracing::warn!(users = adjusted.len(), "Reconciled ledger with journal");
            ledger_file
                .save(&ledger)
                .with_context(|| format!("Failed to save ledger {}", ledger_file.path().display()))?;
        }
        let ledger = Arc::new(ledger);

        tracing::debug!(
            journal = %journal_path.display(),
            events = store.len(),
            "Opened workspace"
        );

        let coordinator = Coordinator::new(Arc::new(store), ledger.clone(), &config);
        Ok(Self {
            coordinator,
            ledger,
            ledger_file,
        })
    }

    /// Writes the ledger snapshot back to disk.
    pub fn persist(&self) -> Result<()> {
        self.ledger_file
            .save(&self.ledger)
            .with_context(|| format!("Failed to save ledger {}", self.ledger_file.path().display()))
    }
}

pub(crate) fn config_service(path: Option<PathBuf>) -> ConfigService {
    match path {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    }
}

pub(crate) fn load_config(path: Option<PathBuf>) -> Result<CoreConfig> {
    config_service(path)
        .get_config()
        .context("Failed to load configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use liaison_core::UserId;
    use liaison_core::action::Action;
    use liaison_core::interaction::Metadata;
    use liaison_core::ledger::Ledger;
    use tempfile::TempDir;

    async fn open(temp_dir: &TempDir) -> Workspace {
        Workspace::open(
            Some(temp_dir.path().join("config.toml")),
            Some(temp_dir.path().join("data")),
        )
        .await
        .expect("Should open workspace")
    }

    #[tokio::test]
    async fn test_reopen_recovers_debits_missing_from_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let (alice, bob) = (UserId::from("alice"), UserId::from("bob"));

        {
            let workspace = open(&temp_dir).await;
            workspace.coordinator.credit(&alice, 5).unwrap();
            workspace.persist().unwrap();
            for action in [Action::Interest, Action::ViewContact] {
                workspace
                    .coordinator
                    .execute(&alice, &bob, action, Metadata::new())
                    .await
                    .expect("Should execute");
            }
            // Dropped without persisting, as after an interrupted `watch`
        }

        let workspace = open(&temp_dir).await;
        let account = workspace.coordinator.get_account(&alice);
        assert_eq!(account.balance, 3);
        assert_eq!(account.total_used, 2);
        assert!(account.is_consistent());

        // The reconciled ledger was written back
        let saved = workspace.ledger_file.load().unwrap();
        assert_eq!(saved.balance(&alice), 3);
    }
}
