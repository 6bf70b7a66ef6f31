//! Session bookkeeping: which modules are required, done, skipped, and what
//! each one produced.
//!
//! All mutation goes through `&mut self`; the owner serializes completion
//! events, so a result can never be recorded twice concurrently.

use chrono::Utc;
use uuid::Uuid;

use super::model::{Session, SessionKind, SessionStatus};
use super::observer::{ProgressEvent, SessionObserver};
use crate::config::SessionOrders;
use crate::error::AssessError;
use crate::modules::{ModuleId, ModuleResult};

/// What `record_completion` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recorded {
    Stored { progress: f64, session_complete: bool },
    /// An identical result was already on file; nothing changed.
    Duplicate,
}

/// What `advance` found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next(ModuleId),
    AllComplete,
    /// Every remaining module was skipped.
    OnlySkipped(Vec<ModuleId>),
}

pub struct SessionOrchestrator {
    orders: SessionOrders,
    word_list: Vec<String>,
    sessions: Vec<Session>,
    observers: Vec<Box<dyn SessionObserver>>,
}

fn notify(observers: &mut [Box<dyn SessionObserver>], session: &Session, event: &ProgressEvent) {
    for o in observers.iter_mut() {
        o.on_event(event);
        o.on_snapshot(session);
    }
}

fn unknown(id: Uuid) -> AssessError {
    AssessError::transition(format!("unknown session {id}"))
}

impl SessionOrchestrator {
    pub fn new(orders: SessionOrders, word_list: Vec<String>) -> Self {
        Self {
            orders,
            word_list,
            sessions: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn session(&self, id: Uuid) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    fn index(&self, id: Uuid) -> Result<usize, AssessError> {
        self.sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| unknown(id))
    }

    /// Return the open session of `kind`, or start a new one.
    pub fn create_or_resume(&mut self, kind: SessionKind) -> &Session {
        let existing = self
            .sessions
            .iter()
            .rposition(|s| s.kind == kind && s.is_open());
        let (idx, resumed) = match existing {
            Some(idx) => (idx, true),
            None => {
                let session = Session::new(
                    kind,
                    self.orders.for_kind(kind).to_vec(),
                    self.word_list.clone(),
                    Utc::now(),
                );
                tracing::info!(session = %session.id, %kind, modules = session.required.len(), "session created");
                self.sessions.push(session);
                (self.sessions.len() - 1, false)
            }
        };
        let session = &self.sessions[idx];
        let event = ProgressEvent::SessionStarted {
            session: session.id,
            kind,
            resumed,
        };
        notify(&mut self.observers, session, &event);
        &self.sessions[idx]
    }

    /// Insert a previously persisted session.
    pub fn restore(&mut self, session: Session) -> Result<(), AssessError> {
        if self.session(session.id).is_some() {
            return Err(AssessError::transition(format!(
                "session {} already loaded",
                session.id
            )));
        }
        if let Some(stray) = session
            .results
            .iter()
            .map(ModuleResult::module_id)
            .find(|m| !session.required.contains(m) || !session.completed.contains(m))
        {
            return Err(AssessError::transition(format!(
                "restored session holds a result for {stray} that is not a completed required module"
            )));
        }
        tracing::info!(session = %session.id, completed = session.completed.len(), "session restored");
        self.sessions.push(session);
        Ok(())
    }

    /// Record a finished module. Idempotent for identical results.
    pub fn record_completion(
        &mut self,
        session_id: Uuid,
        module: ModuleId,
        result: ModuleResult,
    ) -> Result<Recorded, AssessError> {
        let idx = self.index(session_id)?;
        let session = &mut self.sessions[idx];

        if result.module_id() != module {
            return Err(AssessError::transition(format!(
                "result for {} recorded as {module}",
                result.module_id()
            )));
        }
        if let Some(existing) = session.result(module) {
            if *existing == result {
                tracing::debug!(session = %session_id, %module, "duplicate completion ignored");
                return Ok(Recorded::Duplicate);
            }
            return Err(AssessError::transition(format!(
                "{module} already has a different result"
            )));
        }
        if !session.is_open() {
            return Err(AssessError::transition(format!(
                "session {session_id} is {:?}",
                session.status
            )));
        }
        if !session.required.contains(&module) {
            return Err(AssessError::transition(format!(
                "{module} is not part of a {} session",
                session.kind
            )));
        }

        session.skipped.retain(|m| *m != module);
        session.completed.push(module);
        session.results.push(result);
        let progress = session.progress();
        let session_complete = session.all_required_completed();
        tracing::info!(session = %session_id, %module, progress, "module result recorded");

        let event = ProgressEvent::ModuleCompleted {
            session: session_id,
            module,
            progress,
        };
        if session_complete {
            session.status = SessionStatus::Completed;
        }
        let session = &self.sessions[idx];
        notify(&mut self.observers, session, &event);
        if session_complete {
            tracing::info!(session = %session_id, "session completed");
            notify(
                &mut self.observers,
                session,
                &ProgressEvent::SessionCompleted {
                    session: session_id,
                },
            );
        }
        Ok(Recorded::Stored {
            progress,
            session_complete,
        })
    }

    /// Mark a module skipped. It stays required, so the session cannot
    /// complete until it is run.
    pub fn skip(&mut self, session_id: Uuid, module: ModuleId) -> Result<(), AssessError> {
        let idx = self.index(session_id)?;
        let session = &mut self.sessions[idx];
        if !session.is_open() {
            return Err(AssessError::transition(format!(
                "session {session_id} is {:?}",
                session.status
            )));
        }
        if !session.required.contains(&module) || session.is_completed(module) {
            return Err(AssessError::transition(format!(
                "{module} cannot be skipped"
            )));
        }
        if session.is_skipped(module) {
            return Ok(());
        }
        session.skipped.push(module);
        tracing::info!(session = %session_id, %module, "module skipped");
        let session = &self.sessions[idx];
        notify(
            &mut self.observers,
            session,
            &ProgressEvent::ModuleSkipped {
                session: session_id,
                module,
            },
        );
        Ok(())
    }

    /// Make skipped modules eligible again.
    pub fn retry_skipped(&mut self, session_id: Uuid) -> Result<Vec<ModuleId>, AssessError> {
        let idx = self.index(session_id)?;
        let session = &mut self.sessions[idx];
        if !session.is_open() {
            return Err(AssessError::transition(format!(
                "session {session_id} is {:?}",
                session.status
            )));
        }
        Ok(std::mem::take(&mut session.skipped))
    }

    /// Pick the next module to run and mark the session in progress.
    pub fn advance(&mut self, session_id: Uuid) -> Result<Advance, AssessError> {
        let idx = self.index(session_id)?;
        let session = &mut self.sessions[idx];
        match session.status {
            SessionStatus::Completed => return Ok(Advance::AllComplete),
            SessionStatus::Abandoned => {
                return Err(AssessError::transition(format!(
                    "session {session_id} was abandoned"
                )));
            }
            SessionStatus::NotStarted | SessionStatus::InProgress { .. } => {}
        }
        let Some((index, module)) = session.next_pending() else {
            if session.all_required_completed() {
                session.status = SessionStatus::Completed;
                return Ok(Advance::AllComplete);
            }
            return Ok(Advance::OnlySkipped(session.skipped.clone()));
        };
        session.status = SessionStatus::InProgress {
            current_index: index,
        };
        let session = &self.sessions[idx];
        notify(
            &mut self.observers,
            session,
            &ProgressEvent::ModuleStarted {
                session: session_id,
                module,
                index,
            },
        );
        Ok(Advance::Next(module))
    }

    pub fn abandon(&mut self, session_id: Uuid) -> Result<(), AssessError> {
        let idx = self.index(session_id)?;
        let session = &mut self.sessions[idx];
        if !session.is_open() {
            return Ok(());
        }
        session.status = SessionStatus::Abandoned;
        tracing::warn!(session = %session_id, progress = session.progress(), "session abandoned");
        let session = &self.sessions[idx];
        notify(
            &mut self.observers,
            session,
            &ProgressEvent::SessionAbandoned {
                session: session_id,
            },
        );
        Ok(())
    }
}
