//! Sessions command implementation.

use anyhow::Result;
use pedalsync_store::SessionQuery;

use super::RunContext;
use crate::cli::OutputFormat;
use crate::format::{format_sessions_json, format_sessions_text};
use crate::util::{open_store, write_output};

/// Arguments for the sessions command.
pub struct SessionsArgs {
    pub user: Option<String>,
    pub limit: u32,
    pub all: bool,
    pub format: OutputFormat,
}

pub fn cmd_sessions(args: SessionsArgs, ctx: &RunContext) -> Result<()> {
    let store = open_store(&ctx.database)?;
    let user = ctx.user(args.user);

    let mut query = SessionQuery::new().user(&user);
    if !args.all {
        query = query.with_distance();
    }
    // 0 means all.
    if args.limit > 0 {
        query = query.limit(args.limit);
    }

    let content = match args.format {
        OutputFormat::Csv => {
            let mut buffer = Vec::new();
            store.export_csv(&query, &mut buffer)?;
            String::from_utf8(buffer)?
        }
        OutputFormat::Json => format_sessions_json(&store.query_sessions(&query)?, &ctx.opts)?,
        OutputFormat::Text => format_sessions_text(&store.query_sessions(&query)?, &ctx.opts),
    };

    write_output(ctx.output.as_ref(), &content)
}
