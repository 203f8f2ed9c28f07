use super::Workspace;
use anyhow::Result;
use colored::Colorize;
use liaison_core::UserId;

pub fn credit(workspace: &Workspace, user: &str, amount: u64) -> Result<()> {
    let account = workspace.coordinator.credit(&UserId::from(user), amount)?;
    workspace.persist()?;
    println!(
        "{} Credited {} coins to {} (balance {})",
        "✓".green(),
        amount,
        user.bold(),
        account.balance
    );
    Ok(())
}

pub fn balance(workspace: &Workspace, user: &str) -> Result<()> {
    let account = workspace.coordinator.get_account(&UserId::from(user));
    println!("{}", user.bold());
    println!("  balance:   {}", account.balance.to_string().cyan());
    println!("  received:  {}", account.total_received);
    println!("  used:      {}", account.total_used);
    Ok(())
}
