use crate::config::{CollabConfig, ConfigLoader};
use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (merged)
    Show,
    /// Show configuration file paths
    Path,
    /// Write a project config file populated with defaults
    Init {
        /// Replace an existing project config
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(),
        ConfigCommands::Path => show_paths(),
        ConfigCommands::Init { force } => init_project_config(force),
    }
}

fn show_config() -> Result<()> {
    let config = ConfigLoader::load()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{}", toml_str);
    Ok(())
}

fn show_paths() -> Result<()> {
    match ConfigLoader::user_config_path() {
        Some(path) => println!("User config:    {}{}", path.display(), presence(&path)),
        None => println!("User config:    (no home directory)"),
    }
    let project = ConfigLoader::project_config_path();
    println!("Project config: {}{}", project.display(), presence(&project));
    Ok(())
}

fn presence(path: &Path) -> &'static str {
    if path.exists() { "" } else { " (not found)" }
}

fn init_project_config(force: bool) -> Result<()> {
    let path = ConfigLoader::project_config_path();
    ConfigLoader::save_to_path(&CollabConfig::default(), &path, force)?;
    println!("Wrote {}", path.display());
    Ok(())
}
