use crate::cli::formatter::{print_success, print_tip};
use crate::config::{default_config, default_config_path, resolve_config, save_config};
use crate::WaybackError;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write the default configuration to PATH (default location if omitted)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub init: Option<Option<PathBuf>>,

    /// Overwrite an existing file with --init
    #[arg(long)]
    pub force: bool,

    /// Configuration file to show
    #[arg(long, value_name = "FILE", env = "WAYBACK_CONFIG")]
    pub config: Option<PathBuf>,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let Some(target) = args.init else {
        let config = resolve_config(args.config.as_deref())?;
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    };

    let path = match target {
        Some(path) => path,
        None => default_config_path()
            .ok_or_else(|| WaybackError::Other("No configuration directory on this platform".to_string()))?,
    };

    if path.exists() && !args.force {
        anyhow::bail!(
            "Configuration file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    save_config(&path, &default_config())?;
    print_success(&format!("Wrote default configuration to {}", path.display()));
    print_tip("Pass it with --config or set WAYBACK_CONFIG");
    Ok(())
}
