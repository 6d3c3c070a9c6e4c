//! In-memory session slots

use super::view::SessionStatus;
use crate::state_machine::Session;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type SessionId = Uuid;

/// One participant's session plus the token that cancels its in-flight relay call
pub struct SessionSlot {
    session: Mutex<Session>,
    cancel: StdMutex<CancellationToken>,
    last_status: StdMutex<Option<SessionStatus>>,
    created_at: DateTime<Utc>,
}

impl SessionSlot {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            session: Mutex::new(Session::new(now)),
            cancel: StdMutex::new(CancellationToken::new()),
            last_status: StdMutex::new(None),
            created_at: now,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Exclusive access; interactions on one session are serialized
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }

    /// Access only if nothing else holds the session
    pub fn try_lock(&self) -> Option<MutexGuard<'_, Session>> {
        self.session.try_lock().ok()
    }

    /// Remember a readout for callers that find the session locked
    pub fn record_status(&self, status: SessionStatus) {
        *self.last_status.lock().unwrap_or_else(PoisonError::into_inner) = Some(status);
    }

    pub fn last_status(&self) -> Option<SessionStatus> {
        self.last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cancel whatever holds the current token and install a fresh one
    pub fn cancel_in_flight(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }
}

#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<SessionId, Arc<SessionSlot>>>,
}

impl SessionStore {
    pub async fn create(&self, now: DateTime<Utc>) -> SessionId {
        let id = Uuid::new_v4();
        self.slots
            .write()
            .await
            .insert(id, Arc::new(SessionSlot::new(now)));
        id
    }

    pub async fn get(&self, id: &SessionId) -> Option<Arc<SessionSlot>> {
        self.slots.read().await.get(id).cloned()
    }

    /// Snapshot of every slot; locks are taken by the caller
    pub async fn all(&self) -> Vec<(SessionId, Arc<SessionSlot>)> {
        self.slots
            .read()
            .await
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect()
    }
}
