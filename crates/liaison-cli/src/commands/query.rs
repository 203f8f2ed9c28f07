use super::Workspace;
use crate::ActivityArgs;
use anyhow::{Context, Result};
use colored::Colorize;
use futures::StreamExt;
use liaison_core::UserId;
use liaison_core::interaction::{ActivityFilter, Direction, InteractionKind, InteractionStatus};

pub async fn relationship(workspace: &Workspace, viewer: &str, other: &str) -> Result<()> {
    let state = workspace
        .coordinator
        .get_relationship(&UserId::from(viewer), &UserId::from(other))
        .await?;
    println!("{} → {}: {}", viewer.bold(), other.bold(), state.to_string().cyan());
    Ok(())
}

pub async fn activity(workspace: &Workspace, args: ActivityArgs) -> Result<()> {
    let user = UserId::from(args.user.as_str());
    let filter = build_filter(&args)?;
    let mut views = workspace.coordinator.list_activity(&user, filter).await?;

    let mut count = 0usize;
    while let Some(view) = views.next().await {
        count += 1;
        if args.json {
            println!("{}", serde_json::to_string(&view)?);
            continue;
        }
        let arrow = if view.is_sender {
            "→".blue()
        } else {
            "←".magenta()
        };
        println!(
            "{}  {} {} {:<14} {:<10} cost {}  {}",
            view.event.created_at.format("%Y-%m-%d %H:%M:%S"),
            arrow,
            view.counterpart.to_string().bold(),
            view.event.kind.to_string(),
            view.event.status.to_string(),
            view.event.cost,
            view.event.id.to_string().dimmed()
        );
    }

    if !args.json && count == 0 {
        println!("{}", "No activity".dimmed());
    }
    Ok(())
}

fn build_filter(args: &ActivityArgs) -> Result<ActivityFilter> {
    let mut filter = ActivityFilter::default();
    if args.sent {
        filter.direction = Direction::Sent;
    } else if args.received {
        filter.direction = Direction::Received;
    }

    let kinds = args
        .kinds
        .iter()
        .map(|k| {
            k.parse::<InteractionKind>()
                .with_context(|| format!("Unknown kind '{}'", k))
        })
        .collect::<Result<Vec<_>>>()?;
    let statuses = args
        .statuses
        .iter()
        .map(|s| {
            s.parse::<InteractionStatus>()
                .with_context(|| format!("Unknown status '{}'", s))
        })
        .collect::<Result<Vec<_>>>()?;

    filter = filter.with_kinds(kinds).with_statuses(statuses);
    if let Some(counterpart) = &args.counterpart {
        filter = filter.with_counterpart(UserId::from(counterpart.as_str()));
    }
    if let Some(limit) = args.limit {
        filter = filter.with_limit(limit);
    }
    Ok(filter)
}
