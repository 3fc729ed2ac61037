//! `mediatag init-config`

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Args;
use mediatag_core::{SettingsManager, TagsetterSettings};

#[derive(Debug, Args)]
pub struct InitConfigArgs {
    /// Directory to write settings.json into (defaults to the platform config directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Overwrite an existing settings file
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitConfigArgs) -> anyhow::Result<()> {
    let path = write_default_settings(&args)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn write_default_settings(args: &InitConfigArgs) -> anyhow::Result<PathBuf> {
    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => SettingsManager::default_dir()
            .context("No platform config directory, pass --dir")?,
    };

    let manager = SettingsManager::in_dir(&dir);
    if manager.settings_path().exists() && !args.force {
        bail!(
            "{} already exists, use --force to overwrite",
            manager.settings_path().display()
        );
    }

    manager
        .save(&TagsetterSettings::default())
        .context("Failed to write settings")?;
    Ok(manager.settings_path().to_path_buf())
}
