//! Insights session
//!
//! Process-scoped holder of the load lifecycle:
//!
//! ```text
//! idle ──request──▶ loading ──ok, rows──▶ ready
//!                      │     ──ok, none──▶ empty
//!                      └──── failure ───▶ error
//! ready | empty | error ──request──▶ loading
//! ```
//!
//! Every request issues a fresh fetch, even while one is already in flight.
//! Each load is stamped with a token and only the response to the most recent
//! request is applied; a slower, older response is discarded.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::normalizer::{normalize, NormalizedSeries};
use crate::client::AnalysisSource;
use crate::error::InsightsResult;
use crate::models::{AnalysisResult, PatientId};

/// Lifecycle state of the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Loading,
    Ready {
        data: Arc<AnalysisResult>,
        series: NormalizedSeries,
    },
    Empty {
        data: Arc<AnalysisResult>,
    },
    Error {
        message: String,
    },
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::Ready { .. } => "ready",
            SessionState::Empty { .. } => "empty",
            SessionState::Error { .. } => "error",
        }
    }

    /// The analysis held by a completed load
    pub fn data(&self) -> Option<&Arc<AnalysisResult>> {
        match self {
            SessionState::Ready { data, .. } | SessionState::Empty { data } => Some(data),
            _ => None,
        }
    }
}

/// Point-in-time copy of the session for readers
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub has_loaded_once: bool,
    pub patient_id: Option<PatientId>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Handle for one issued load; completing with a stale ticket is a no-op
#[derive(Debug)]
pub struct LoadTicket {
    token: u64,
    patient_id: PatientId,
}

impl LoadTicket {
    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }
}

/// What happened to a completed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Applied,
    /// A newer request was issued after this one
    Superseded,
}

struct SessionInner {
    state: SessionState,
    has_loaded_once: bool,
    patient_id: Option<PatientId>,
    updated_at: Option<DateTime<Utc>>,
    latest_token: u64,
}

pub struct InsightsSession {
    inner: Mutex<SessionInner>,
}

impl InsightsSession {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                has_loaded_once: false,
                patient_id: None,
                updated_at: None,
                latest_token: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        // Transitions never panic midway, so a poisoned guard still holds a consistent state
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.lock();
        SessionSnapshot {
            state: inner.state.clone(),
            has_loaded_once: inner.has_loaded_once,
            patient_id: inner.patient_id.clone(),
            updated_at: inner.updated_at,
        }
    }

    /// Enter `loading` and stamp a new load
    pub fn begin_load(&self, patient_id: PatientId) -> LoadTicket {
        let mut inner = self.lock();
        inner.latest_token += 1;
        inner.state = SessionState::Loading;
        inner.patient_id = Some(patient_id.clone());
        inner.updated_at = Some(Utc::now());

        info!(patient_id = %patient_id, token = inner.latest_token, "Loading health insights");
        LoadTicket {
            token: inner.latest_token,
            patient_id,
        }
    }

    pub fn fetch_succeeded(&self, ticket: &LoadTicket, raw: AnalysisResult) -> LoadOutcome {
        let series = normalize(&raw);
        let data = Arc::new(raw);

        self.apply(ticket, |inner| {
            inner.has_loaded_once = true;
            if series.is_empty() {
                info!(patient_id = %ticket.patient_id, "Analysis has no chartable metrics");
                inner.state = SessionState::Empty { data };
            } else {
                info!(patient_id = %ticket.patient_id, points = series.len(), "Health insights ready");
                inner.state = SessionState::Ready { data, series };
            }
        })
    }

    pub fn fetch_failed(&self, ticket: &LoadTicket, message: impl Into<String>) -> LoadOutcome {
        let message = message.into();
        self.apply(ticket, |inner| {
            warn!(patient_id = %ticket.patient_id, %message, "Health insights failed to load");
            inner.state = SessionState::Error { message };
        })
    }

    pub fn complete(&self, ticket: &LoadTicket, result: InsightsResult<AnalysisResult>) -> LoadOutcome {
        match result {
            Ok(raw) => self.fetch_succeeded(ticket, raw),
            Err(e) => self.fetch_failed(ticket, e.to_string()),
        }
    }

    fn apply<F>(&self, ticket: &LoadTicket, transition: F) -> LoadOutcome
    where
        F: FnOnce(&mut SessionInner),
    {
        let mut inner = self.lock();
        if ticket.token != inner.latest_token {
            warn!(
                patient_id = %ticket.patient_id,
                token = ticket.token,
                latest = inner.latest_token,
                "Discarding superseded analysis response"
            );
            return LoadOutcome::Superseded;
        }

        transition(&mut inner);
        inner.updated_at = Some(Utc::now());
        LoadOutcome::Applied
    }

    /// Fetch an analysis for the patient and apply the result
    pub async fn request_load(
        &self,
        source: &dyn AnalysisSource,
        patient_id: PatientId,
    ) -> (LoadOutcome, SessionSnapshot) {
        let ticket = self.begin_load(patient_id);
        let result = source.fetch_analysis(ticket.patient_id()).await;
        let outcome = self.complete(&ticket, result);
        (outcome, self.snapshot())
    }
}

impl Default for InsightsSession {
    fn default() -> Self {
        Self::new()
    }
}
