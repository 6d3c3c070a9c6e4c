//! Runtime for participant sessions
//!
//! Owns every session, drives the phase machine, applies its effects and
//! brokers chat, export and researcher actions.

mod store;
mod view;

#[cfg(test)]
pub mod testing;

pub use store::SessionId;
pub use view::{ParticipantView, SessionStatus};

use crate::auth::AdminGrant;
use crate::conditions::{ConditionCatalog, ConditionId, RandomSource};
use crate::export::{self, Artifact, ExportError, ExportFormat};
use crate::relay::{ChatRelay, RelayError};
use crate::state_machine::{
    transition, Effect, Event, Phase, Session, TransitionError, TransitionResult,
};
use store::{SessionSlot, SessionStore};
use chrono::{DateTime, Utc};
use reqwest::Url;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("Unknown condition: {0}")]
    UnknownCondition(ConditionId),
}

/// Assistant reply plus the refreshed view
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: String,
    pub view: ParticipantView,
}

pub struct StudyRuntime {
    store: SessionStore,
    catalog: ConditionCatalog,
    rng: Arc<dyn RandomSource>,
    relay: ChatRelay,
    survey_url: Url,
}

impl StudyRuntime {
    pub fn new(
        catalog: ConditionCatalog,
        rng: Arc<dyn RandomSource>,
        relay: ChatRelay,
        survey_url: Url,
    ) -> Self {
        Self {
            store: SessionStore::default(),
            catalog,
            rng,
            relay,
            survey_url,
        }
    }

    pub async fn create_session(&self) -> ParticipantView {
        let now = Utc::now();
        let id = self.store.create(now).await;
        tracing::info!(session_id = %id, "Session created");
        ParticipantView::build(id, &Session::new(now), &self.catalog, &self.survey_url, now)
    }

    /// Read-only participant view
    pub async fn view(&self, id: SessionId) -> Result<ParticipantView, RuntimeError> {
        let slot = self.slot(id).await?;
        let session = slot.lock().await;
        Ok(self.participant_view(id, &session))
    }

    /// Run a participant event through the phase machine
    pub async fn dispatch(&self, id: SessionId, event: Event) -> Result<ParticipantView, RuntimeError> {
        let slot = self.slot(id).await?;
        let mut session = slot.lock().await;
        self.step(id, &mut session, event)?;
        Ok(self.participant_view(id, &session))
    }

    /// Relay a chat message; the session stays locked for the whole exchange
    ///
    /// The token is taken before waiting for the lock; a reset issued while
    /// this call is queued cancels it.
    pub async fn chat(&self, id: SessionId, text: String) -> Result<ChatOutcome, RuntimeError> {
        let slot = self.slot(id).await?;
        let cancel = slot.cancel_token();
        let mut session = slot.lock().await;
        // Served to researchers until the reply lands
        self.session_status(id, &slot, &session);

        let reply = self
            .relay
            .send(&mut session, &self.catalog, text, &cancel)
            .await
            .map_err(|e| {
                tracing::warn!(session_id = %id, error = %e, "Chat failed");
                e
            })?;

        Ok(ChatOutcome {
            reply,
            view: self.participant_view(id, &session),
        })
    }

    /// Never waits on an in-flight chat reply
    pub async fn status(&self, id: SessionId, _grant: AdminGrant) -> Result<SessionStatus, RuntimeError> {
        let slot = self.slot(id).await?;
        Ok(self.read_status(id, &slot).await)
    }

    /// Every session, oldest first
    pub async fn list(&self, _grant: AdminGrant) -> Vec<SessionStatus> {
        let mut statuses = Vec::new();
        for (id, slot) in self.store.all().await {
            statuses.push(self.read_status(id, &slot).await);
        }
        statuses.sort_by_key(|s| (s.created_at, s.session_id));
        statuses
    }

    pub async fn export(
        &self,
        id: SessionId,
        format: ExportFormat,
        _grant: AdminGrant,
    ) -> Result<Artifact, RuntimeError> {
        let slot = self.slot(id).await?;
        let session = slot.lock().await;
        let artifact = export::export(&session, &self.catalog, format, Utc::now())?;
        tracing::info!(
            session_id = %id,
            filename = %artifact.filename,
            bytes = artifact.bytes.len(),
            "Log exported"
        );
        Ok(artifact)
    }

    /// Force the session into any phase
    pub async fn override_phase(
        &self,
        id: SessionId,
        to: Phase,
        grant: AdminGrant,
    ) -> Result<SessionStatus, RuntimeError> {
        let slot = self.slot(id).await?;
        let mut session = slot.lock().await;
        self.step(id, &mut session, Event::Override { to, grant })?;
        Ok(self.session_status(id, &slot, &session))
    }

    pub async fn override_condition(
        &self,
        id: SessionId,
        condition: ConditionId,
        grant: AdminGrant,
    ) -> Result<SessionStatus, RuntimeError> {
        if self.catalog.get(&condition).is_none() {
            return Err(RuntimeError::UnknownCondition(condition));
        }
        let slot = self.slot(id).await?;
        let mut session = slot.lock().await;
        tracing::info!(
            session_id = %id,
            from = ?session.condition().map(ConditionId::as_str),
            to = %condition,
            "Condition overridden"
        );
        session.override_condition(condition, grant);
        Ok(self.session_status(id, &slot, &session))
    }

    /// Cancel any in-flight relay call and start the session over at login
    pub async fn reset(&self, id: SessionId, _grant: AdminGrant) -> Result<SessionStatus, RuntimeError> {
        let slot = self.slot(id).await?;
        slot.cancel_in_flight();
        let mut session = slot.lock().await;
        *session = Session::new(Utc::now());
        tracing::info!(session_id = %id, "Session reset");
        Ok(self.session_status(id, &slot, &session))
    }

    async fn slot(&self, id: SessionId) -> Result<Arc<SessionSlot>, RuntimeError> {
        self.store
            .get(&id)
            .await
            .ok_or(RuntimeError::SessionNotFound(id))
    }

    fn session_status(&self, id: SessionId, slot: &SessionSlot, session: &Session) -> SessionStatus {
        let status = SessionStatus::build(id, slot.created_at(), session, &self.catalog);
        slot.record_status(status.clone());
        status
    }

    /// Fresh readout when the session is free, otherwise the last one marked busy
    async fn read_status(&self, id: SessionId, slot: &SessionSlot) -> SessionStatus {
        if let Some(session) = slot.try_lock() {
            return self.session_status(id, slot, &session);
        }
        match slot.last_status() {
            Some(status) => SessionStatus { busy: true, ..status },
            None => {
                let session = slot.lock().await;
                self.session_status(id, slot, &session)
            }
        }
    }

    fn participant_view(&self, id: SessionId, session: &Session) -> ParticipantView {
        ParticipantView::build(id, session, &self.catalog, &self.survey_url, Utc::now())
    }

    fn step(&self, id: SessionId, session: &mut Session, event: Event) -> Result<(), TransitionError> {
        let from = session.phase();
        let event_name = event.name();
        let result = transition(from, event).map_err(|e| {
            tracing::info!(session_id = %id, phase = %from, event = event_name, error = %e, "Event rejected");
            e
        })?;
        self.apply(id, session, result, Utc::now());
        tracing::info!(
            session_id = %id,
            from = %from,
            to = %session.phase(),
            event = event_name,
            "Phase transition"
        );
        Ok(())
    }

    fn apply(&self, id: SessionId, session: &mut Session, result: TransitionResult, now: DateTime<Utc>) {
        for effect in result.effects {
            match effect {
                Effect::RecordParticipant { participant_id } => {
                    tracing::info!(session_id = %id, participant_id = %participant_id, "Participant logged in");
                    session.set_participant(participant_id);
                }
                Effect::AssignCondition => {
                    let condition = session.ensure_condition(&self.catalog, self.rng.as_ref());
                    tracing::info!(session_id = %id, condition = %condition, "Condition assigned");
                }
                Effect::SaveStory { text } => session.set_story(text),
            }
        }
        session.enter_phase(result.new_phase, now);
    }
}
