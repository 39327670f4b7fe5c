//! Dashboard lifecycle as a single finite-state value.
//!
//! ```text
//! awaiting-input --upload--> processing --parse ok--> ready(pending) --insights--> ready(resolved)
//!                                 |
//!                                 +--parse failed--> failed
//! any --reset--> awaiting-input
//! ```
//!
//! Every upload carries a fresh id. Events for an id that is no longer
//! current are refused as stale, which is how a superseded upload is
//! cancelled.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use crate::assembler::AssembledSeries;
use crate::error::TransitionError;
use crate::models::{Insight, SensorReading, StatsCollection};

// ---

/// Policy for an upload that arrives while another one is still in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPolicy {
    /// The newer upload wins; results of the older one are discarded.
    #[default]
    Supersede,
    /// The newer upload is refused until the current one settles.
    Reject,
}

impl FromStr for UploadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supersede" | "cancel" => Ok(UploadPolicy::Supersede),
            "reject" | "busy" => Ok(UploadPolicy::Reject),
            other => Err(format!("unknown upload policy '{other}'")),
        }
    }
}

impl fmt::Display for UploadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadPolicy::Supersede => f.write_str("supersede"),
            UploadPolicy::Reject => f.write_str("reject"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "items", rename_all = "lowercase")]
pub enum InsightStatus {
    Pending,
    Resolved(Vec<Insight>),
}

/// Everything shown once an upload has been parsed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    // ---
    pub upload_id: Uuid,
    pub source_label: String,
    pub sources: Vec<String>,
    pub reading_count: usize,
    pub readings: Vec<SensorReading>,
    pub stats: StatsCollection,
    pub insights: InsightStatus,
}

impl Dashboard {
    // ---
    pub fn new(upload_id: Uuid, series: AssembledSeries, stats: StatsCollection) -> Self {
        Dashboard {
            upload_id,
            source_label: series.source_label,
            sources: series.sources,
            reading_count: series.readings.len(),
            readings: series.readings,
            stats,
            insights: InsightStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "phase", rename_all = "kebab-case")]
pub enum DashboardState {
    #[default]
    AwaitingInput,
    #[serde(rename_all = "camelCase")]
    Processing { upload_id: Uuid },
    Ready(Dashboard),
    #[serde(rename_all = "camelCase")]
    Failed { upload_id: Uuid, message: String },
}

/// Transition triggers.
#[derive(Debug)]
pub enum SessionEvent {
    UploadReceived { upload_id: Uuid },
    ParseComplete(Dashboard),
    ParseFailed { upload_id: Uuid, message: String },
    InsightsResolved { upload_id: Uuid, insights: Vec<Insight> },
    Reset,
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::UploadReceived { .. } => "upload-received",
            SessionEvent::ParseComplete(_) => "parse-complete",
            SessionEvent::ParseFailed { .. } => "parse-failed",
            SessionEvent::InsightsResolved { .. } => "insights-resolved",
            SessionEvent::Reset => "reset",
        }
    }
}

impl DashboardState {
    // ---
    pub fn phase(&self) -> &'static str {
        match self {
            DashboardState::AwaitingInput => "awaiting-input",
            DashboardState::Processing { .. } => "processing",
            DashboardState::Ready(_) => "ready",
            DashboardState::Failed { .. } => "failed",
        }
    }

    /// Id of the upload this state belongs to, if any.
    pub fn upload_id(&self) -> Option<Uuid> {
        match self {
            DashboardState::AwaitingInput => None,
            DashboardState::Processing { upload_id } | DashboardState::Failed { upload_id, .. } => {
                Some(*upload_id)
            }
            DashboardState::Ready(dashboard) => Some(dashboard.upload_id),
        }
    }

    /// True while an upload has not yet reached a settled state.
    pub fn is_in_flight(&self) -> bool {
        match self {
            DashboardState::Processing { .. } => true,
            DashboardState::Ready(d) => d.insights == InsightStatus::Pending,
            _ => false,
        }
    }

    /// Drop everything held and return to `awaiting-input`.
    pub fn reset(&mut self) {
        *self = DashboardState::AwaitingInput;
    }

    /// Apply `event`. On error the state is left untouched.
    pub fn apply(&mut self, event: SessionEvent, policy: UploadPolicy) -> Result<(), TransitionError> {
        // ---
        if matches!(event, SessionEvent::Reset) {
            self.reset();
            return Ok(());
        }

        let next = match (&*self, event) {

            (DashboardState::Failed { .. }, event @ SessionEvent::UploadReceived { .. }) => {
                return Err(self.invalid(&event));
            }
            (current, SessionEvent::UploadReceived { upload_id }) => {
                if current.is_in_flight() && policy == UploadPolicy::Reject {
                    return Err(TransitionError::Busy);
                }
                DashboardState::Processing { upload_id }
            }

            (DashboardState::Processing { upload_id }, SessionEvent::ParseComplete(dashboard))
                if *upload_id == dashboard.upload_id =>
            {
                DashboardState::Ready(dashboard)
            }
            (
                DashboardState::Processing { upload_id: current },
                SessionEvent::ParseFailed { upload_id, message },
            ) if *current == upload_id => DashboardState::Failed { upload_id, message },

            (DashboardState::Ready(dashboard), SessionEvent::InsightsResolved { upload_id, insights })
                if dashboard.upload_id == upload_id && dashboard.insights == InsightStatus::Pending =>
            {
                let mut dashboard = dashboard.clone();
                dashboard.insights = InsightStatus::Resolved(insights);
                DashboardState::Ready(dashboard)
            }

            (_, event) => {
                return Err(match event_upload_id(&event) {
                    Some(id) if Some(id) != self.upload_id() => TransitionError::Stale(id),
                    _ => self.invalid(&event),
                });
            }
        };

        *self = next;
        Ok(())
    }

    fn invalid(&self, event: &SessionEvent) -> TransitionError {
        TransitionError::Invalid {
            phase: self.phase(),
            event: event.name(),
        }
    }
}

fn event_upload_id(event: &SessionEvent) -> Option<Uuid> {
    match event {
        SessionEvent::UploadReceived { upload_id }
        | SessionEvent::ParseFailed { upload_id, .. }
        | SessionEvent::InsightsResolved { upload_id, .. } => Some(*upload_id),
        SessionEvent::ParseComplete(dashboard) => Some(dashboard.upload_id),
        SessionEvent::Reset => None,
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::Severity;

    fn dashboard(upload_id: Uuid) -> Dashboard {
        Dashboard::new(upload_id, AssembledSeries::default(), StatsCollection::default())
    }

    fn insight() -> Insight {
        Insight {
            severity: Severity::Info,
            title: "t".into(),
            description: "d".into(),
            recommendation: "r".into(),
        }
    }

    fn ready_resolved(policy: UploadPolicy) -> (DashboardState, Uuid) {
        // ---
        let id = Uuid::new_v4();
        let mut state = DashboardState::default();
        state.apply(SessionEvent::UploadReceived { upload_id: id }, policy).unwrap();
        state.apply(SessionEvent::ParseComplete(dashboard(id)), policy).unwrap();
        state
            .apply(SessionEvent::InsightsResolved { upload_id: id, insights: vec![insight()] }, policy)
            .unwrap();
        (state, id)
    }

    #[test]
    fn test_happy_path() {
        // ---
        let (state, id) = ready_resolved(UploadPolicy::Reject);
        assert_eq!(state.phase(), "ready");
        assert_eq!(state.upload_id(), Some(id));
        assert!(!state.is_in_flight());

        match state {
            DashboardState::Ready(d) => assert_eq!(d.insights, InsightStatus::Resolved(vec![insight()])),
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn test_parse_failure_then_reset() {
        // ---
        let policy = UploadPolicy::Supersede;
        let id = Uuid::new_v4();
        let mut state = DashboardState::default();
        state.apply(SessionEvent::UploadReceived { upload_id: id }, policy).unwrap();
        state
            .apply(SessionEvent::ParseFailed { upload_id: id, message: "no rows".into() }, policy)
            .unwrap();
        assert_eq!(state.phase(), "failed");

        // A failed session must be reset before the next upload.
        let err = state
            .apply(SessionEvent::UploadReceived { upload_id: Uuid::new_v4() }, policy)
            .unwrap_err();
        assert!(matches!(err, TransitionError::Invalid { phase: "failed", .. }));

        state.apply(SessionEvent::Reset, policy).unwrap();
        assert_eq!(state.phase(), "awaiting-input");
        assert_eq!(state.upload_id(), None);
    }

    #[test]
    fn test_reset_from_every_phase() {
        // ---
        let id = Uuid::new_v4();
        let states = [
            DashboardState::AwaitingInput,
            DashboardState::Processing { upload_id: id },
            DashboardState::Ready(dashboard(id)),
            DashboardState::Failed { upload_id: id, message: "no rows".into() },
        ];
        for mut state in states {
            state.reset();
            assert_eq!(state.phase(), "awaiting-input");
            assert_eq!(state.upload_id(), None);
            assert!(!state.is_in_flight());
        }
    }

    #[test]
    fn test_reject_policy_refuses_concurrent_upload() {
        // ---
        let policy = UploadPolicy::Reject;
        let first = Uuid::new_v4();
        let mut state = DashboardState::default();
        state.apply(SessionEvent::UploadReceived { upload_id: first }, policy).unwrap();

        let err = state
            .apply(SessionEvent::UploadReceived { upload_id: Uuid::new_v4() }, policy)
            .unwrap_err();
        assert_eq!(err, TransitionError::Busy);
        assert_eq!(state.upload_id(), Some(first));

        // Still busy while insights are pending.
        state.apply(SessionEvent::ParseComplete(dashboard(first)), policy).unwrap();
        assert_eq!(
            state.apply(SessionEvent::UploadReceived { upload_id: Uuid::new_v4() }, policy),
            Err(TransitionError::Busy)
        );
    }

    #[test]
    fn test_supersede_policy_discards_older_upload() {
        // ---
        let policy = UploadPolicy::Supersede;
        let (older, newer) = (Uuid::new_v4(), Uuid::new_v4());
        let mut state = DashboardState::default();
        state.apply(SessionEvent::UploadReceived { upload_id: older }, policy).unwrap();
        state.apply(SessionEvent::UploadReceived { upload_id: newer }, policy).unwrap();

        let err = state
            .apply(SessionEvent::ParseComplete(dashboard(older)), policy)
            .unwrap_err();
        assert_eq!(err, TransitionError::Stale(older));
        assert_eq!(state.phase(), "processing");

        state.apply(SessionEvent::ParseComplete(dashboard(newer)), policy).unwrap();
        assert_eq!(
            state.apply(
                SessionEvent::InsightsResolved { upload_id: older, insights: vec![] },
                policy
            ),
            Err(TransitionError::Stale(older))
        );
        assert!(state.is_in_flight());
    }

    #[test]
    fn test_new_upload_after_settled_dashboard() {
        // ---
        let (mut state, _) = ready_resolved(UploadPolicy::Reject);
        let next = Uuid::new_v4();
        state
            .apply(SessionEvent::UploadReceived { upload_id: next }, UploadPolicy::Reject)
            .unwrap();
        assert_eq!(state.phase(), "processing");
        assert_eq!(state.upload_id(), Some(next));
    }

    #[test]
    fn test_out_of_order_events_are_invalid() {
        // ---
        let mut state = DashboardState::default();
        let err = state
            .apply(
                SessionEvent::InsightsResolved { upload_id: Uuid::new_v4(), insights: vec![] },
                UploadPolicy::Supersede,
            )
            .unwrap_err();
        assert!(matches!(err, TransitionError::Stale(_)));

        let (mut state, id) = ready_resolved(UploadPolicy::Supersede);
        let err = state
            .apply(
                SessionEvent::InsightsResolved { upload_id: id, insights: vec![] },
                UploadPolicy::Supersede,
            )
            .unwrap_err();
        assert!(matches!(err, TransitionError::Invalid { phase: "ready", event: "insights-resolved" }));
    }

    #[test]
    fn test_state_serialization() {
        // ---
        let json = serde_json::to_value(DashboardState::default()).unwrap();
        assert_eq!(json["phase"], "awaiting-input");

        let id = Uuid::new_v4();
        let json = serde_json::to_value(DashboardState::Ready(dashboard(id))).unwrap();
        assert_eq!(json["phase"], "ready");
        assert_eq!(json["uploadId"], id.to_string());
        assert_eq!(json["readingCount"], 0);
        assert_eq!(json["insights"]["status"], "pending");
    }

    #[test]
    fn test_policy_parsing() {
        // ---
        assert_eq!("Reject".parse::<UploadPolicy>(), Ok(UploadPolicy::Reject));
        assert_eq!("supersede".parse::<UploadPolicy>(), Ok(UploadPolicy::Supersede));
        assert!("queue".parse::<UploadPolicy>().is_err());
    }
}
