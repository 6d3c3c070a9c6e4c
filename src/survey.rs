//! Post-study survey handoff and the advisory phase timer

use crate::conditions::ConditionId;
use crate::state_machine::Phase;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Serialize;

/// Survey link carrying the participant and condition
pub fn handoff_url(base: &Url, participant_id: &str, condition: &ConditionId) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("PID", participant_id)
        .append_pair("GROUP", condition.as_str());
    url
}

/// Informational countdown for the current phase. Nothing is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerReading {
    pub label: &'static str,
    pub minutes: u32,
    pub remaining_secs: i64,
}

pub fn read_timer(
    phase: Phase,
    phase_started_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<TimerReading> {
    let timer = phase.advisory_timer()?;
    let elapsed = (now - phase_started_at).num_seconds().max(0);
    Some(TimerReading {
        label: timer.label,
        minutes: timer.minutes,
        remaining_secs: (i64::from(timer.minutes) * 60 - elapsed).max(0),
    })
}
