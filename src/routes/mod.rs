//! Route gateway: merges every subrouter and attaches the shared state.
//!
//! `main.rs` and the integration tests only see [`router`] and [`AppState`].

use std::sync::{Arc, Mutex, MutexGuard};

use axum::Router;

use crate::collaborator::InsightCollaborator;
use crate::session::DashboardState;
use crate::Config;

mod dashboard;
mod health;
mod uploads;

// ---

/// State shared by all handlers.
///
/// The session mutex is only held for single state transitions, never across
/// an `.await`.
#[derive(Clone)]
pub struct AppState {
    // ---
    pub config: Arc<Config>,
    pub collaborator: Option<Arc<dyn InsightCollaborator>>,
    session: Arc<Mutex<DashboardState>>,
}

impl AppState {
    // ---
    pub fn new(config: Config, collaborator: Option<Arc<dyn InsightCollaborator>>) -> Self {
        AppState {
            config: Arc::new(config),
            collaborator,
            session: Arc::new(Mutex::new(DashboardState::default())),
        }
    }

    /// Lock the session. A poisoned lock is recovered; every transition
    /// replaces the state wholesale, so it is never left half-written.
    fn session(&self) -> MutexGuard<'_, DashboardState> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(uploads::router())
        .merge(dashboard::router())
        .merge(health::router())
        .with_state(state)
}
