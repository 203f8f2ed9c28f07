use super::{config_service, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

pub fn show(path: Option<PathBuf>) -> Result<()> {
    let config = load_config(path)?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}

pub fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let written = config_service(path).init_default(force)?;
    println!("{} Wrote default configuration to {}", "✓".green(), written.display());
    Ok(())
}

pub fn path(path: Option<PathBuf>) -> Result<()> {
    let resolved = config_service(path).config_path()?;
    let marker = if resolved.exists() {
        "exists".green()
    } else {
        "missing, defaults apply".yellow()
    };
    println!("{} ({})", resolved.display(), marker);
    Ok(())
}
