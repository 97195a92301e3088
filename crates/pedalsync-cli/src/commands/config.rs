//! Config command implementation.

use anyhow::{Context, Result, bail};

use super::RunContext;
use crate::cli::ConfigAction;
use crate::config::Config;
use crate::util::write_output;

pub fn cmd_config(action: ConfigAction, ctx: &RunContext) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut content =
                toml::to_string_pretty(&ctx.config).context("Failed to serialize config")?;
            content.push_str(&format!(
                "\n# effective database: {}\n",
                ctx.database.display()
            ));
            write_output(ctx.output.as_ref(), &content)?;
        }
        ConfigAction::Path => {
            println!("{}", ctx.config_path.display());
        }
        ConfigAction::Init { force } => {
            if ctx.config_path.exists() && !force {
                bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    ctx.config_path.display()
                );
            }
            Config::default().save_to(&ctx.config_path)?;
            if !ctx.quiet {
                eprintln!("Wrote {}", ctx.config_path.display());
            }
        }
    }
    Ok(())
}
