//! Operator-tunable configuration.
//!
//! Everything here is data, not logic: the action cost table, retry and
//! timeout bounds, fan-out buffer sizes, storage locations and the documented
//! metadata keys per interaction kind.

use crate::interaction::InteractionKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub costs: CostSchedule,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub fanout: FanoutSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub metadata: MetadataSettings,
}

/// Coins charged to the actor per initiating action.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CostSchedule {
    #[serde(default = "one")]
    pub interest: u64,
    #[serde(default = "two")]
    pub super_interest: u64,
    #[serde(default = "one")]
    pub view_contact: u64,
    #[serde(default = "one")]
    pub chat: u64,
    #[serde(default)]
    pub visit: u64,
    #[serde(default)]
    pub shortlist: u64,
    #[serde(default)]
    pub block: u64,
    #[serde(default)]
    pub report: u64,
    #[serde(default)]
    pub meet_request: u64,
}

fn one() -> u64 {
    1
}

fn two() -> u64 {
    2
}

impl Default for CostSchedule {
    fn default() -> Self {
        Self {
            interest: 1,
            super_interest: 2,
            view_contact: 1,
            chat: 1,
            visit: 0,
            shortlist: 0,
            block: 0,
            report: 0,
            meet_request: 0,
        }
    }
}

impl CostSchedule {
    pub fn cost_of(&self, kind: InteractionKind) -> u64 {
        match kind {
            InteractionKind::Interest => self.interest,
            InteractionKind::SuperInterest => self.super_interest,
            InteractionKind::ViewContact => self.view_contact,
            InteractionKind::Chat => self.chat,
            InteractionKind::Visit => self.visit,
            InteractionKind::Shortlist => self.shortlist,
            InteractionKind::Block => self.block,
            InteractionKind::Report => self.report,
            InteractionKind::MeetRequest => self.meet_request,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Extra attempts after a `TransientStoreFailure`.
    #[serde(default = "default_transient_retries")]
    pub transient_retries: u32,
    /// Bound on lock acquisition, resolution, validation and reservation.
    #[serde(default = "default_execute_timeout_ms")]
    pub execute_timeout_ms: u64,
}

fn default_transient_retries() -> u32 {
    1
}

fn default_execute_timeout_ms() -> u64 {
    5_000
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            transient_retries: default_transient_retries(),
            execute_timeout_ms: default_execute_timeout_ms(),
        }
    }
}

impl GatewaySettings {
    pub fn execute_timeout(&self) -> Duration {
        Duration::from_millis(self.execute_timeout_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FanoutSettings {
    /// Per-session buffer; when full the oldest notification is dropped.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Root for durable files; the platform data dir when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_journal_file")]
    pub journal_file: String,
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,
}

fn default_journal_file() -> String {
    "interactions.jsonl".to_string()
}

fn default_ledger_file() -> String {
    "ledger.toml".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            journal_file: default_journal_file(),
            ledger_file: default_ledger_file(),
        }
    }
}

/// Recognized metadata keys per kind (snake_case kind name -> keys).
///
/// Unknown keys are still stored; this table only documents intent.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MetadataSettings {
    #[serde(default)]
    pub recognized: BTreeMap<String, Vec<String>>,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        let mut recognized = BTreeMap::new();
        recognized.insert("interest".to_string(), vec!["message".to_string()]);
        recognized.insert("super_interest".to_string(), vec!["message".to_string()]);
        recognized.insert(
            "meet_request".to_string(),
            vec![
                "service".to_string(),
                "proposed_at".to_string(),
                "location".to_string(),
            ],
        );
        recognized.insert("chat".to_string(), vec!["message".to_string()]);
        recognized.insert("report".to_string(), vec!["reason".to_string()]);
        Self { recognized }
    }
}

impl MetadataSettings {
    /// Keys in `metadata` that are not documented for `kind`.
    pub fn unrecognized_keys<'a>(
        &self,
        kind: InteractionKind,
        keys: impl IntoIterator<Item = &'a String>,
    ) -> Vec<String> {
        let known = self.recognized.get(&kind.to_string());
        keys.into_iter()
            .filter(|key| known.is_none_or(|known| !known.contains(key)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cost_schedule() {
        let costs = CostSchedule::default();
        assert_eq!(costs.cost_of(InteractionKind::Interest), 1);
        assert_eq!(costs.cost_of(InteractionKind::SuperInterest), 2);
        assert_eq!(costs.cost_of(InteractionKind::ViewContact), 1);
        assert_eq!(costs.cost_of(InteractionKind::Chat), 1);
        assert_eq!(costs.cost_of(InteractionKind::Visit), 0);
        assert_eq!(costs.cost_of(InteractionKind::MeetRequest), 0);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CoreConfig = toml::from_str(
            r#"
            [costs]
            chat = 3

            [fanout]
            channel_capacity = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.costs.chat, 3);
        assert_eq!(config.costs.interest, 1);
        assert_eq!(config.fanout.channel_capacity, 8);
        assert_eq!(config.gateway.transient_retries, 1);
        assert_eq!(config.storage.journal_file, "interactions.jsonl");
    }

    #[test]
    fn test_unrecognized_metadata_keys() {
        let settings = MetadataSettings::default();
        let keys = vec!["service".to_string(), "budget".to_string()];
        assert_eq!(
            settings.unrecognized_keys(InteractionKind::MeetRequest, &keys),
            vec!["budget".to_string()]
        );
    }
}
