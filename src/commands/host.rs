use std::path::Path;

use colored::Colorize;

use video_skipper::config::Config;
use video_skipper::dom::Page;
use video_skipper::error::Result;
use video_skipper::groups::GroupStore;
use video_skipper::host;
use video_skipper::session::Session;

use crate::cli::{Cli, HostCommands};

pub async fn run(cli: &Cli, page: Option<&Path>, command: Option<&HostCommands>) -> Result<()> {
    match command {
        Some(HostCommands::Install { extension_id }) => install(cli, extension_id).await,
        Some(HostCommands::Uninstall) => uninstall(cli).await,
        None => serve(cli, page).await,
    }
}

/// Entry point when the browser spawns the binary directly.
pub async fn run_for_browser() -> Result<()> {
    let config = Config::load()?;
    let store = GroupStore::load(&config.store_path(None))?;
    let session = Session::new(Page::new(""), store, &config);
    host::run(&session).await
}

async fn serve(cli: &Cli, page: Option<&Path>) -> Result<()> {
    let config = Config::load()?;
    let (_, store) = super::load_store(cli, &config)?;
    let page = match page {
        Some(path) => Page::load_snapshot(path)?,
        None => Page::new(""),
    };

    tracing::info!(
        "Native messaging host ready ({} group(s), page {:?})",
        store.len(),
        page.hostname()
    );
    let session = Session::new(page, store, &config);
    host::run(&session).await
}

async fn install(cli: &Cli, extension_id: &str) -> Result<()> {
    let path = host::install_manifest(extension_id)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "status": "installed",
                "name": host::NATIVE_HOST_NAME,
                "path": path.display().to_string(),
            })
        );
    } else {
        println!(
            "{} Native messaging host {} installed",
            "✓".green(),
            host::NATIVE_HOST_NAME.bold()
        );
        println!("  {} {}", "Manifest:".dimmed(), path.display());
    }

    Ok(())
}

async fn uninstall(cli: &Cli) -> Result<()> {
    let removed = host::uninstall_manifest()?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "status": if removed { "removed" } else { "not_installed" },
                "name": host::NATIVE_HOST_NAME,
            })
        );
    } else if removed {
        println!("{} Native messaging host removed", "✓".green());
    } else {
        println!("{} Native messaging host was not installed", "!".yellow());
    }

    Ok(())
}
