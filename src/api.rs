//! HTTP API for the co-writing study
//!
//! Participant routes live under `/api/sessions`, researcher routes under
//! `/api/admin` behind a bearer credential.

mod admin;
mod handlers;
mod types;

pub use handlers::create_router;

use crate::auth::AdminCredential;
use crate::runtime::StudyRuntime;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<StudyRuntime>,
    pub admin: Arc<AdminCredential>,
}

impl AppState {
    pub fn new(runtime: StudyRuntime, admin: AdminCredential) -> Self {
        Self {
            runtime: Arc::new(runtime),
            admin: Arc::new(admin),
        }
    }
}
