//! Ride command implementation.
//!
//! Readings come from a script file or a synthetic ride and are replayed
//! through the same controller a live sensor would feed. Unless `--realtime`
//! is given, the tokio clock is paused so the replay finishes immediately
//! while durations, sync ticks and calories follow the scripted timeline.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use pedalsync_core::{
    MockTransport, ReadingStream, SensorTransport, SessionController, SessionEvent, SessionHandle,
    mock::synthetic_ride,
};
use pedalsync_types::SessionRecord;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use super::RunContext;
use crate::cli::{OutputFormat, RideArgs};
use crate::format::{format_progress, format_record_json, format_record_text, format_records_csv};
use crate::script::load_script;
use crate::util::{open_backend, write_output};

pub async fn cmd_ride(args: RideArgs, ctx: &RunContext) -> Result<()> {
    if let Some(weight) = args.weight
        && !(weight.is_finite() && weight > 0.0)
    {
        bail!("Weight must be a positive number of kg, got {}", weight);
    }

    if !args.realtime {
        tokio::time::pause();
    }

    let pace = Duration::from_millis(args.pace_ms.max(1));
    let script = match (&args.script, args.simulate) {
        (Some(path), _) => load_script(path, pace)?,
        (None, Some(minutes)) if minutes > 0 => {
            synthetic_ride(Duration::from_secs(minutes * 60), pace)
        }
        (None, Some(_)) => bail!("--simulate needs at least one minute"),
        (None, None) => bail!("Either --script or --simulate is required"),
    };
    let source = match &args.script {
        Some(path) => path.display().to_string(),
        None => "synthetic ride".to_string(),
    };
    info!("Replaying {} readings from {}", script.len(), source);

    let transport = MockTransport::new(&source);
    transport.set_script(script).await;
    transport
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", transport.name()))?;

    let backend = Arc::new(open_backend(&ctx.database)?);
    let config = ctx.config.session.to_session_config(args.sync_secs);

    // The controller idles on this stream until the session has started,
    // so the first scripted reading cannot race the start command.
    let (_idle, idle_stream) = ReadingStream::channel(1);
    let handle = SessionController::spawn(config, idle_stream, backend.clone(), backend)?;
    let mut events = handle.subscribe();

    let user = ctx.user(args.user.user.clone());
    let session_id = handle.start_session(user, args.weight).await?;
    handle.attach_stream(transport.subscribe().await?).await?;

    let record = follow_session(&handle, &mut events, session_id, ctx).await?;
    handle.shutdown().await.ok();
    transport.disconnect().await.ok();

    let Some(record) = record else {
        bail!("Session {} ended without a record", session_id);
    };

    let content = match args.format {
        OutputFormat::Text => format_record_text(&record, &ctx.opts),
        OutputFormat::Json => format_record_json(&record, &ctx.opts)?,
        OutputFormat::Csv => format_records_csv(std::slice::from_ref(&record))?,
    };
    write_output(ctx.output.as_ref(), &content)
}

/// Print progress until the session stops, stopping it on Ctrl-C or when the
/// sensor goes away.
async fn follow_session(
    handle: &SessionHandle,
    events: &mut pedalsync_core::EventReceiver,
    session_id: pedalsync_types::SessionId,
    ctx: &RunContext,
) -> Result<Option<SessionRecord>> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::Stopped { record }) if record.session_id == session_id => {
                    return Ok(Some(record));
                }
                Ok(event) => {
                    if !ctx.quiet
                        && let Some(line) = format_progress(&event, &ctx.opts)
                    {
                        eprintln!("{}", line);
                    }
                    if matches!(event, SessionEvent::SensorDisconnected { .. })
                        && let Some(record) = handle.stop_session().await?
                    {
                        return Ok(Some(record));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Progress output skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return Ok(None),
            },
            _ = &mut ctrl_c => {
                if !ctx.quiet {
                    eprintln!("Interrupted, stopping session");
                }
                return Ok(handle.stop_session().await?);
            }
        }
    }
}
