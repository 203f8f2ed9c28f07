use super::Workspace;
use crate::ExecuteArgs;
use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;
use liaison_core::action::{Action, ActionRequest};
use liaison_core::interaction::Metadata;
use liaison_core::{CoreError, EventId, UserId};

pub async fn execute(workspace: &Workspace, args: ExecuteArgs) -> Result<()> {
    let action = parse_action(&args.action, args.proposal.as_deref())?;
    let metadata = parse_metadata(&args.metadata)?;
    let request = ActionRequest::new(args.actor.as_str(), args.target.as_str(), action)
        .with_metadata(metadata);

    match workspace.coordinator.execute_request(request).await {
        Ok(event) => {
            workspace.persist()?;
            let state = workspace
                .coordinator
                .get_relationship(&UserId::from(args.actor.as_str()), &event.target_id)
                .await?;
            println!(
                "{} {} {} → {} ({}, cost {})",
                "✓".green(),
                event.kind.to_string().bold(),
                event.actor_id,
                event.target_id,
                event.status,
                event.cost
            );
            println!("  event:        {}", event.id);
            println!("  relationship: {}", state.to_string().cyan());
            Ok(())
        }
        Err(err) if err.is_business_outcome() => {
            println!("{} {}", "✗".red(), err);
            if let CoreError::InsufficientBalance { .. } = err {
                println!("  {}", "Top up with `liaison credit <user> <amount>`".dimmed());
            }
            bail!("action rejected")
        }
        Err(err) => Err(err).context("Execution failed"),
    }
}

/// Parses an action name; `proposal` pins the proposal a response or
/// withdrawal applies to.
pub fn parse_action(name: &str, proposal: Option<&str>) -> Result<Action> {
    let action = Action::parse(name).ok_or_else(|| anyhow!("Unknown action '{}'", name))?;
    let Some(raw) = proposal else {
        return Ok(action);
    };
    let id: EventId = raw
        .parse()
        .with_context(|| format!("Invalid proposal id '{}'", raw))?;
    match action {
        Action::Respond { decision, .. } => Ok(Action::Respond {
            decision,
            proposal_id: Some(id),
        }),
        Action::Withdraw { .. } => Ok(Action::Withdraw {
            proposal_id: Some(id),
        }),
        other => bail!("--proposal only applies to responses and withdrawals, not {}", other),
    }
}

/// Parses `key=value` pairs; values that are valid JSON keep their type.
pub fn parse_metadata(entries: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("Metadata must be key=value, got '{}'", entry))?;
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        metadata.insert(key.trim().to_string(), value);
    }
    Ok(metadata)
}
