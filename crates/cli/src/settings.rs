//! `roster config` and config-file resolution shared by every command.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use roster_recon::ReconConfig;

use crate::exit_codes::{EXIT_CONFIG, EXIT_IO};
use crate::CliError;

/// File looked up under the user's config directory when `--config` is absent.
pub const USER_CONFIG_FILE: &str = "roster-recon/recon.toml";

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective config as TOML
    #[command(after_help = "\
Examples:
  roster config show
  roster config show --config recon.toml > my.recon.toml")]
    Show {
        /// Config file (defaults to the user config, then the built-in table)
        #[arg(long, env = "ROSTER_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Parse and validate a config file without running
    #[command(after_help = "\
Examples:
  roster config check recon.toml")]
    Check {
        /// Path to the .toml config file
        file: PathBuf,
    },
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Show { config } => {
            let (config, source) = resolve_config(config.as_deref())?;
            let text = config
                .to_toml()
                .map_err(|e| CliError::new(EXIT_CONFIG, e.to_string()))?;
            eprintln!("# source: {source}");
            print!("{text}");
            Ok(())
        }
        ConfigCommands::Check { file } => {
            let config = read_config(&file)?;
            let compared = config.compared_fields().count();
            eprintln!(
                "ok: '{}' ({} field(s), {} compared, reference date {})",
                config.name,
                config.fields.len(),
                compared,
                config.reference_date
            );
            Ok(())
        }
    }
}

/// Effective config plus a description of where it came from.
///
/// Order: explicit path, `<config dir>/roster-recon/recon.toml`, built-in default.
pub fn resolve_config(explicit: Option<&Path>) -> Result<(ReconConfig, String), CliError> {
    if let Some(path) = explicit {
        return Ok((read_config(path)?, path.display().to_string()));
    }
    if let Some(path) = user_config_path().filter(|p| p.is_file()) {
        log::info!("using user config '{}'", path.display());
        return Ok((read_config(&path)?, path.display().to_string()));
    }
    Ok((ReconConfig::default(), "built-in default".to_string()))
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_FILE))
}

fn read_config(path: &Path) -> Result<ReconConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_IO, format!("cannot read config '{}': {e}", path.display()))
    })?;
    ReconConfig::from_toml(&text).map_err(|e| {
        CliError::new(EXIT_CONFIG, format!("'{}': {e}", path.display()))
            .with_hint("`roster config show` prints a complete config to start from")
    })
}
