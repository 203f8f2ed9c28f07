use super::Workspace;
use super::interact::parse_action;
use anyhow::Result;
use colored::Colorize;
use liaison_application::SessionStream;
use liaison_core::UserId;
use liaison_core::action::ActionRequest;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Connects a live session per user, then executes one action per stdin
/// line (`<actor> <target> <action> [proposal-id]`) until EOF, printing every
/// notification the sessions receive. The ledger is saved after every
/// executed action.
pub async fn run(workspace: &Workspace, users: Vec<String>) -> Result<()> {
    let coordinator = &workspace.coordinator;

    let mut channels = Vec::with_capacity(users.len());
    let mut printers = Vec::with_capacity(users.len());
    for user in &users {
        let session = coordinator.connect(&UserId::from(user.as_str()));
        channels.push(session.channel_id());
        printers.push(tokio::spawn(print_notifications(session)));
    }

    println!(
        "{} Watching {}. One action per line: <actor> <target> <action> [proposal-id]. Ctrl-D to stop.",
        "●".green(),
        users.join(", ").bold()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] => continue,
            [first, ..] if first.starts_with('#') => continue,
            [actor, target, action, rest @ ..] => {
                let action = match parse_action(action, rest.first().copied()) {
                    Ok(action) => action,
                    Err(err) => {
                        println!("{} {}", "✗".red(), err);
                        continue;
                    }
                };
                let request = ActionRequest::new(*actor, *target, action);
                match coordinator.execute_request(request).await {
                    Ok(event) => {
                        workspace.persist()?;
                        println!(
                            "{} {} {} → {} [{}]",
                            "✓".green(),
                            event.kind,
                            event.actor_id,
                            event.target_id,
                            event.id.to_string().dimmed()
                        );
                    }
                    Err(err) => println!("{} {}", "✗".red(), err),
                }
            }
            _ => println!("{} expected <actor> <target> <action>", "✗".red()),
        }
    }

    for channel_id in channels {
        coordinator.disconnect(channel_id);
    }
    for printer in printers {
        printer.await?;
    }
    Ok(())
}

async fn print_notifications(mut session: SessionStream) {
    while let Some(notification) = session.next().await {
        println!(
            "  {} #{} {} {} {} → {} ({}) now {}",
            format!("[{}]", notification.recipient).cyan(),
            notification.user_sequence,
            notification.kind,
            notification.status,
            notification.actor_id,
            notification.target_id,
            notification.occurred_at.format("%H:%M:%S%.3f"),
            notification.relationship.to_string().bold()
        );
    }
    if session.dropped() > 0 {
        println!(
            "  {} {} missed {} notifications",
            "!".yellow(),
            session.user_id(),
            session.dropped()
        );
    }
}
