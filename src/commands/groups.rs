use colored::Colorize;

use video_skipper::config::Config;
use video_skipper::error::Result;
use video_skipper::groups::preferred_group;

use crate::cli::Cli;

pub async fn run(cli: &Cli) -> Result<()> {
    let config = Config::load()?;
    let (path, store) = super::load_store(cli, &config)?;
    let active = preferred_group(&store);

    if cli.json {
        let groups: Vec<serde_json::Value> = store
            .iter()
            .map(|(name, group)| {
                serde_json::json!({
                    "name": name,
                    "skip1": group.skip1,
                    "skip2": group.skip2,
                    "pinned": group.pinned,
                    "pinnedTime": group.pinned_time,
                    "active": Some(name) == active,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "store": path.display().to_string(),
                "active": active,
                "groups": groups,
            }))?
        );
        return Ok(());
    }

    if store.is_empty() {
        println!(
            "{} No groups in {}",
            "!".yellow(),
            path.display().to_string().dimmed()
        );
        return Ok(());
    }

    println!(
        "{} {} group(s) in {}\n",
        "✓".green(),
        store.len(),
        path.display().to_string().dimmed()
    );

    let width = store.names().map(|name| name.chars().count()).max().unwrap_or(0);
    for (name, group) in store.iter() {
        let marker = if Some(name) == active {
            "●".green()
        } else {
            "○".dimmed()
        };
        let pin = if group.pinned { "pinned".cyan() } else { "".normal() };
        println!(
            "{} {}  {:>6} {:>6}  {}",
            marker,
            format!("{:<width$}", name, width = width).bold(),
            format_duration(group.skip1),
            format_duration(group.skip2),
            pin
        );
    }

    Ok(())
}

/// `m:ss` for a skip duration, `off` when the shortcut is disabled.
fn format_duration(seconds: f64) -> String {
    if seconds.is_nan() || seconds <= 0.0 {
        return "off".to_string();
    }
    let total = seconds.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
