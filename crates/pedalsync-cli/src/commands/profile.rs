//! Profile command implementation.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use super::RunContext;
use crate::cli::ProfileAction;
use crate::util::{open_store, write_output};

pub fn cmd_profile(action: ProfileAction, ctx: &RunContext) -> Result<()> {
    let store = open_store(&ctx.database)?;

    match action {
        ProfileAction::Show { user } => {
            let user = ctx.user(user.user);
            let content = match store.get_profile(&user)? {
                Some(profile) => format!("{}: {:.1} kg\n", user, profile.weight_kg),
                None => format!(
                    "{}: no weight stored (rides use {:.1} kg)\n",
                    user, ctx.config.session.default_weight_kg
                ),
            };
            write_output(ctx.output.as_ref(), &content)?;
        }
        ProfileAction::SetWeight { weight, user } => {
            let user = ctx.user(user.user);
            store
                .set_user_weight(&user, weight)
                .with_context(|| format!("Failed to set weight for {}", user))?;
            if !ctx.quiet {
                let value = format!("{:.1} kg", weight);
                if ctx.opts.no_color {
                    eprintln!("Weight for {} set to {}", user, value);
                } else {
                    eprintln!("Weight for {} set to {}", user, value.green());
                }
            }
        }
    }
    Ok(())
}
