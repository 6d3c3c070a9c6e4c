//! Researcher log export
//!
//! `export` is a pure function of the session snapshot: it never mutates the
//! session, and the only time-dependent field is the caller-supplied
//! `exported_at`.

use crate::conditions::{ConditionCatalog, ConditionId};
use crate::state_machine::{ChatTurn, Phase, Session};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Json,
    Text,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Text => "txt",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Text => "text/plain; charset=utf-8",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("No participant has logged in to this session")]
    MissingParticipant,
    #[error("No condition has been assigned to this session")]
    MissingCondition,
    #[error("Unknown condition: {0}")]
    UnknownCondition(ConditionId),
    #[error("Failed to encode log: {0}")]
    Encode(String),
}

/// Downloadable log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    participant_id: &'a str,
    assigned_group: &'a ConditionId,
    condition_detail: &'a str,
    guide_text: &'a str,
    hidden_instruction: &'a str,
    phase: Phase,
    final_story: &'a str,
    word_count: usize,
    chat_history: &'a [ChatTurn],
    exported_at: String,
}

/// Serialize a session for the researcher
pub fn export(
    session: &Session,
    catalog: &ConditionCatalog,
    format: ExportFormat,
    exported_at: DateTime<Utc>,
) -> Result<Artifact, ExportError> {
    let participant_id = session
        .participant_id()
        .ok_or(ExportError::MissingParticipant)?;
    let condition_id = session.condition().ok_or(ExportError::MissingCondition)?;
    let condition = catalog
        .get(condition_id)
        .ok_or_else(|| ExportError::UnknownCondition(condition_id.clone()))?;

    let record = LogRecord {
        participant_id,
        assigned_group: &condition.id,
        condition_detail: &condition.label,
        guide_text: &condition.guide_text,
        hidden_instruction: &condition.hidden_instruction,
        phase: session.phase(),
        final_story: session.story_text(),
        word_count: session.story_word_count(),
        chat_history: session.transcript().turns(),
        exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    };

    let bytes = match format {
        ExportFormat::Json => serde_json::to_vec_pretty(&record)
            .map_err(|e| ExportError::Encode(e.to_string()))?,
        ExportFormat::Text => render_text(&record).into_bytes(),
    };

    Ok(Artifact {
        filename: filename(participant_id, &condition.id, format),
        content_type: format.content_type(),
        bytes,
    })
}

/// `LOG_<participant>_<condition>.<ext>`, restricted to filesystem-safe characters
pub fn filename(participant_id: &str, condition: &ConditionId, format: ExportFormat) -> String {
    format!(
        "LOG_{}_{}.{}",
        sanitize(participant_id),
        sanitize(condition.as_str()),
        format.extension()
    )
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn render_text(record: &LogRecord<'_>) -> String {
    // Writing to a String cannot fail
    let mut out = String::new();
    let _ = writeln!(out, "Participant: {}", record.participant_id);
    let _ = writeln!(
        out,
        "Condition: {} ({})",
        record.assigned_group, record.condition_detail
    );
    let _ = writeln!(out, "Phase: {}", record.phase);
    let _ = writeln!(out, "Exported at: {}", record.exported_at);
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Hidden instruction ===");
    let _ = writeln!(out, "{}", record.hidden_instruction);
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Guide shown to participant ===");
    let _ = writeln!(out, "{}", record.guide_text);
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Chat history ({} turns) ===", record.chat_history.len());
    for (i, turn) in record.chat_history.iter().enumerate() {
        let _ = writeln!(out, "[{}] {}:", i + 1, turn.role.as_str());
        let _ = writeln!(out, "{}", turn.content);
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "=== Final story ({} words) ===", record.word_count);
    let _ = writeln!(out, "{}", record.final_story);
    out
}
