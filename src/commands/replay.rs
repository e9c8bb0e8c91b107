use std::path::Path;

use colored::Colorize;

use video_skipper::config::Config;
use video_skipper::error::Result;
use video_skipper::replay::{replay, Scenario};
use video_skipper::session::Reply;

use crate::cli::Cli;

pub async fn run(cli: &Cli, scenario_path: &Path) -> Result<()> {
    let config = Config::load()?;
    let scenario = Scenario::load(scenario_path)?;
    let store = if scenario.storage.is_some() {
        Default::default()
    } else {
        super::load_store(cli, &config)?.1
    };

    let report = replay(&scenario, store, &config).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for record in &report.events {
        let outcome = match (&record.reply, &record.error) {
            (_, Some(error)) => format!("error: {}", error).red(),
            (Some(Reply::Status(_)), _) => "status".normal(),
            _ => "ack".dimmed(),
        };
        println!(
            "  {} {} {}",
            format!("+{}ms", record.at_ms).dimmed(),
            record.event,
            outcome
        );
    }

    let status = &report.status;
    println!();
    println!(
        "{} Replayed {} event(s) on {}",
        "✓".green(),
        report.events.len(),
        status.hostname.bold()
    );
    println!(
        "  {} {}",
        "Active group:".dimmed(),
        status.active_group.as_deref().unwrap_or("(none)")
    );
    println!(
        "  {} {}",
        "Video:".dimmed(),
        status.video.as_deref().unwrap_or("(not found)")
    );
    match status.position {
        Some(position) => println!("  {} {:.2}s", "Position:".dimmed(), position),
        None => println!("  {} -", "Position:".dimmed()),
    }
    match status.undo_position {
        Some(position) => println!("  {} {:.2}s", "Undo to:".dimmed(), position),
        None => println!("  {} -", "Undo to:".dimmed()),
    }

    Ok(())
}
