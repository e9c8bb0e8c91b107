pub mod config;
pub mod groups;
pub mod host;
pub mod locate;
pub mod replay;

use std::path::PathBuf;

use video_skipper::config::Config;
use video_skipper::error::Result;
use video_skipper::groups::GroupStore;

use crate::cli::Cli;

/// Group store named by `--store` / `VIDEO_SKIPPER_STORE`, else by the config.
pub(crate) fn load_store(cli: &Cli, config: &Config) -> Result<(PathBuf, GroupStore)> {
    let path = config.store_path(cli.store.as_deref());
    let store = GroupStore::load(&path)?;
    Ok((path, store))
}
