//! Summary command implementation.

use anyhow::{Result, bail};
use pedalsync_core::ride_summary;

use super::RunContext;
use crate::cli::OutputFormat;
use crate::format::{format_summary_json, format_summary_text};
use crate::util::{open_backend, write_output};

pub async fn cmd_summary(user: Option<String>, format: OutputFormat, ctx: &RunContext) -> Result<()> {
    let backend = open_backend(&ctx.database)?;
    let user = ctx.user(user);
    let summary = ride_summary(&backend, &user).await?;

    let content = match format {
        OutputFormat::Text => format_summary_text(&user, &summary, &ctx.opts),
        OutputFormat::Json => format_summary_json(&summary, &ctx.opts)?,
        OutputFormat::Csv => bail!("Summary has no CSV form; use --format json"),
    };
    write_output(ctx.output.as_ref(), &content)
}
