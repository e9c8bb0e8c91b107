use colored::Colorize;
use dialoguer::Confirm;

use video_skipper::config::Config;
use video_skipper::error::{Result, SkipperError};

use crate::cli::{Cli, ConfigCommands};

pub async fn run(cli: &Cli, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(cli).await,
        ConfigCommands::Set { key, value } => set(cli, key, value).await,
        ConfigCommands::Get { key } => get(cli, key).await,
        ConfigCommands::Path => path(cli).await,
        ConfigCommands::Reset => reset(cli).await,
    }
}

async fn show(cli: &Cli) -> Result<()> {
    let config = Config::load()?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| SkipperError::ConfigError(e.to_string()))?;
        println!("{}", toml_str);
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        SkipperError::ConfigError(format!("{} must be a non-negative integer", key))
    })
}

async fn set(cli: &Cli, key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;

    match key {
        "retry.max_attempts" => config.retry.max_attempts = parse_number(key, value)?,
        "retry.interval_ms" => config.retry.interval_ms = parse_number(key, value)?,
        "watch.rescan_delay_ms" => config.watch.rescan_delay_ms = parse_number(key, value)?,
        "watch.poll_interval_ms" => config.watch.poll_interval_ms = parse_number(key, value)?,
        "store.path" => config.store.path = Some(value.to_string()),
        _ => {
            return Err(SkipperError::ConfigError(format!(
                "Unknown config key: {}",
                key
            )))
        }
    }

    config.validate()?;
    config.save()?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "status": "set", "key": key, "value": value })
        );
    } else {
        println!("{} Set {} = {}", "✓".green(), key, value);
    }

    Ok(())
}

async fn get(cli: &Cli, key: &str) -> Result<()> {
    let config = Config::load()?;

    let value = match key {
        "retry.max_attempts" => Some(config.retry.max_attempts.to_string()),
        "retry.interval_ms" => Some(config.retry.interval_ms.to_string()),
        "watch.rescan_delay_ms" => Some(config.watch.rescan_delay_ms.to_string()),
        "watch.poll_interval_ms" => Some(config.watch.poll_interval_ms.to_string()),
        "store.path" => config.store.path.clone(),
        _ => {
            return Err(SkipperError::ConfigError(format!(
                "Unknown config key: {}",
                key
            )))
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "key": key,
                "value": value
            })
        );
    } else {
        match value {
            Some(v) => println!("{}", v),
            None => println!("{}", "(not set)".dimmed()),
        }
    }

    Ok(())
}

async fn reset(cli: &Cli) -> Result<()> {
    let path = Config::config_path();

    if !path.exists() {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "status": "no_config", "path": path.display().to_string() })
            );
        } else {
            println!("{} No config file to remove.", "✓".green());
        }
        return Ok(());
    }

    if !cli.json {
        let confirm = Confirm::new()
            .with_prompt(format!("Delete {}?", path.display()))
            .default(false)
            .interact()
            .map_err(|e| SkipperError::Other(format!("Prompt failed: {}", e)))?;

        if !confirm {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    std::fs::remove_file(&path)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "status": "removed", "path": path.display().to_string() })
        );
    } else {
        println!(
            "{} Config removed: {}",
            "✓".green(),
            path.display().to_string().dimmed()
        );
    }

    Ok(())
}

async fn path(cli: &Cli) -> Result<()> {
    let path = Config::config_path();

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string()
            })
        );
    } else {
        println!("{}", path.display());
    }

    Ok(())
}
