use std::path::Path;

use colored::Colorize;

use video_skipper::dom::Page;
use video_skipper::error::Result;
use video_skipper::locator::VideoLocator;

use crate::cli::Cli;

pub async fn run(cli: &Cli, page_path: &Path) -> Result<()> {
    let page = Page::load_snapshot(page_path)?;
    let found = VideoLocator::new().locate_traced(&page);

    if cli.json {
        let value = match &found {
            Some((handle, step)) => serde_json::json!({
                "found": true,
                "hostname": page.hostname(),
                "step": step,
                "video": page.describe(handle.video),
                "ref": page.name_of(handle.video),
                "currentTime": page.current_time(handle.video),
                "controlSurface": handle.surface.is_some(),
            }),
            None => serde_json::json!({
                "found": false,
                "hostname": page.hostname(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match found {
        Some((handle, step)) => {
            println!(
                "{} Found {} via {}",
                "✓".green(),
                page.describe(handle.video).bold(),
                step
            );
            if let Some(name) = page.name_of(handle.video) {
                println!("  {} {}", "Ref:".dimmed(), name);
            }
            match page.current_time(handle.video) {
                Some(position) => println!("  {} {:.2}s", "Position:".dimmed(), position),
                None => println!("  {} {}", "Position:".dimmed(), "(no playback state)".dimmed()),
            }
            if handle.surface.is_some() {
                println!("  {} player API", "Control:".dimmed());
            }
        }
        None => {
            println!(
                "{} No video element found on {}",
                "!".yellow(),
                page.hostname()
            );
        }
    }

    Ok(())
}
