//! Output formatting for text, JSON, and CSV output.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use pedalsync_core::{ResetCause, SessionEvent};
use pedalsync_store::StoredSession;
use pedalsync_types::{RideSummary, SessionRecord};
use serde::Serialize;
use time::OffsetDateTime;
use time::macros::format_description;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self { no_color }
    }

    /// Serialize value to pretty JSON with a trailing newline.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)? + "\n")
    }

    fn label(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            text.bold().to_string()
        }
    }

    fn highlight(&self, text: String) -> String {
        if self.no_color {
            text
        } else {
            text.cyan().to_string()
        }
    }

    fn warn(&self, text: String) -> String {
        if self.no_color {
            text
        } else {
            text.yellow().to_string()
        }
    }
}

/// `1:02:03` for rides of an hour or more, `12:34` otherwise.
pub fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

fn format_time(t: OffsetDateTime) -> String {
    t.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| "Unknown".to_string())
}

// ============================================================================
// Finished session
// ============================================================================

pub fn format_record_text(record: &SessionRecord, opts: &FormatOptions) -> String {
    let mut output = format!(
        "{} {}\n",
        opts.label("Session"),
        opts.highlight(record.session_id.to_string())
    );
    let rows = [
        ("Rider", record.user_id.clone()),
        ("Started", format_time(record.started_at)),
        ("Duration", format_duration(record.duration_secs)),
        ("Distance", format!("{:.2} km", record.distance)),
        ("Cycles", record.cycles.to_string()),
        ("Calories", format!("{} kcal", record.calories)),
        ("Avg speed", format!("{:.1} km/h", record.avg_speed)),
        ("Max speed", format!("{:.1} km/h", record.max_speed)),
    ];
    for (name, value) in rows {
        output.push_str(&format!("  {:<10} {}\n", opts.label(name), value));
    }
    if !record.has_distance() {
        output.push_str(&opts.warn("  No distance recorded; hidden from history.\n".to_string()));
    }
    output
}

pub fn format_record_json(record: &SessionRecord, opts: &FormatOptions) -> Result<String> {
    opts.as_json(record)
}

/// CSV rows for finished records, header included.
pub fn format_records_csv(records: &[SessionRecord]) -> Result<String> {
    #[derive(Serialize)]
    struct Row<'a> {
        session_id: String,
        user_id: &'a str,
        started_at: String,
        ended_at: String,
        duration_secs: u64,
        distance_km: f64,
        cycles: u64,
        calories: u32,
        avg_speed_kmh: f64,
        max_speed_kmh: f64,
    }

    let rfc3339 = |t: OffsetDateTime| {
        t.format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default()
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(Row {
            session_id: record.session_id.to_string(),
            user_id: &record.user_id,
            started_at: rfc3339(record.started_at),
            ended_at: rfc3339(record.ended_at),
            duration_secs: record.duration_secs,
            distance_km: record.distance,
            cycles: record.cycles,
            calories: record.calories,
            avg_speed_kmh: record.avg_speed,
            max_speed_kmh: record.max_speed,
        })?;
    }
    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    Ok(String::from_utf8(bytes)?)
}

// ============================================================================
// Session lists and summaries
// ============================================================================

pub fn format_sessions_text(sessions: &[StoredSession], opts: &FormatOptions) -> String {
    use tabled::builder::Builder;
    use tabled::settings::Style;

    if sessions.is_empty() {
        return "No sessions found.\n".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record([
        "Started", "Duration", "Distance", "Cycles", "Calories", "Avg", "Max",
    ]);
    for s in sessions {
        builder.push_record([
            format_time(s.started_at),
            format_duration(s.duration_secs),
            format!("{:.2} km", s.distance),
            s.cycles.to_string(),
            format!("{} kcal", s.calories),
            format!("{:.1}", s.avg_speed),
            format!("{:.1}", s.max_speed),
        ]);
    }

    let mut table = builder.build();
    if opts.no_color {
        table.with(Style::blank());
    } else {
        table.with(Style::rounded());
    }

    format!(
        "{} ({}):\n\n{}\n",
        opts.label("Sessions"),
        sessions.len(),
        table
    )
}

pub fn format_sessions_json(sessions: &[StoredSession], opts: &FormatOptions) -> Result<String> {
    opts.as_json(&sessions)
}

pub fn format_summary_text(user_id: &str, summary: &RideSummary, opts: &FormatOptions) -> String {
    if summary.sessions == 0 {
        return format!("No finished rides for {}.\n", user_id);
    }
    let mut output = format!("{} {}\n", opts.label("Rides for"), opts.highlight(user_id.to_string()));
    let rows = [
        ("Sessions", summary.sessions.to_string()),
        ("Time", format_duration(summary.total_duration_secs)),
        ("Distance", format!("{:.2} km", summary.total_distance)),
        ("Cycles", summary.total_cycles.to_string()),
        ("Calories", format!("{} kcal", summary.total_calories)),
        ("Longest", format!("{:.2} km", summary.longest_distance)),
        ("Best avg", format!("{:.1} km/h", summary.best_avg_speed)),
    ];
    for (name, value) in rows {
        output.push_str(&format!("  {:<9} {}\n", opts.label(name), value));
    }
    output
}

pub fn format_summary_json(summary: &RideSummary, opts: &FormatOptions) -> Result<String> {
    opts.as_json(summary)
}

// ============================================================================
// Live progress
// ============================================================================

/// One progress line for a live event, or `None` for events not worth a line.
pub fn format_progress(event: &SessionEvent, opts: &FormatOptions) -> Option<String> {
    match event {
        SessionEvent::Started {
            session_id,
            user_id,
            user_weight_kg,
        } => Some(format!(
            "{} session {} for {} ({:.1} kg)",
            opts.label("Started"),
            opts.highlight(session_id.to_string()),
            user_id,
            user_weight_kg
        )),
        SessionEvent::Synced { snapshot } => Some(format!(
            "[{}] {:.2} km  {} cycles  {} kcal  avg {:.1} km/h",
            format_duration(snapshot.duration_secs),
            snapshot.distance,
            snapshot.cycles,
            snapshot.calories,
            snapshot.avg_speed
        )),
        SessionEvent::Reset { cause, .. } => Some(opts.warn(match cause {
            ResetCause::Hardware => "Sensor counters reset; session restarted".to_string(),
            ResetCause::Manual => "Session data reset".to_string(),
        })),
        SessionEvent::SyncFailed { error, .. } => Some(opts.warn(format!("Sync failed: {}", error))),
        SessionEvent::PersistFailed { error, .. } => {
            Some(opts.warn(format!("Could not store session: {}", error)))
        }
        SessionEvent::SensorDisconnected { .. } => Some(opts.warn("Sensor disconnected".to_string())),
        _ => None,
    }
}
