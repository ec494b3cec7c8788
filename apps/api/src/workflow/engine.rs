//! Workflow engine: one forward pass per turn.
//!
//! START → CLASSIFYING → ROUTING → HANDLING → DONE
//!
//! The thread lock is held from checkpoint load to checkpoint save. A turn
//! that fails before HANDLING completes saves nothing, so the previous
//! checkpoint stays authoritative.

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::workflow::classifier::{
    classify_by_keywords, Classification, ClassificationError, IntentClassifier,
};
use crate::workflow::context;
use crate::workflow::handlers::{HandlerInput, HandlerOutcome};
use crate::workflow::locks::ThreadLocks;
use crate::workflow::retention::{CompactionReport, RetentionPolicy};
use crate::workflow::router::{Router, RoutingError};
use crate::workflow::state::{Context, Intent, Message, SessionState, VersionSource};
use crate::workflow::store::{PersistenceError, SessionStore, ThreadId};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// What the engine does when the model-backed classifier fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationFallback {
    /// Classify with the keyword heuristic and continue the turn.
    #[default]
    Heuristic,
    /// Fail the turn with `ClassificationError`.
    FailTurn,
}

impl FromStr for ClassificationFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "heuristic" => Ok(Self::Heuristic),
            "fail" | "fail_turn" => Ok(Self::FailTurn),
            other => Err(format!(
                "unknown classification fallback '{other}' (expected 'heuristic' or 'fail')"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Classifying,
    Routing,
    Handling,
    Done,
}

impl Phase {
    /// Successor in the forward pass. `Done` is terminal.
    pub fn next(self) -> Phase {
        match self {
            Phase::Start => Phase::Classifying,
            Phase::Classifying => Phase::Routing,
            Phase::Routing => Phase::Handling,
            Phase::Handling | Phase::Done => Phase::Done,
        }
    }
}

struct PhaseTracker<'a> {
    phase: Phase,
    thread_id: &'a ThreadId,
}

impl<'a> PhaseTracker<'a> {
    fn new(thread_id: &'a ThreadId) -> Self {
        Self {
            phase: Phase::Start,
            thread_id,
        }
    }

    fn advance(&mut self) {
        let next = self.phase.next();
        debug!("[{}] {:?} -> {:?}", self.thread_id, self.phase, next);
        self.phase = next;
    }
}

#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub user_id: String,
    pub session_id: Option<String>,
    pub message: String,
    pub document_content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub thread_id: ThreadId,
    pub response: String,
    pub intent: Intent,
    pub confidence: f64,
    pub context: Context,
    /// Failure reason when the handler replied with an apology.
    pub degraded: Option<String>,
}

pub struct WorkflowEngine {
    classifier: Arc<dyn IntentClassifier>,
    router: Router,
    store: Arc<dyn SessionStore>,
    locks: ThreadLocks,
    fallback: ClassificationFallback,
    retention: RetentionPolicy,
}

impl WorkflowEngine {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        router: Router,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            classifier,
            router,
            store,
            locks: ThreadLocks::new(),
            fallback: ClassificationFallback::default(),
            retention: RetentionPolicy::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: ClassificationFallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutcome, WorkflowError> {
        let thread_id = ThreadId::new(&request.user_id, request.session_id.as_deref());
        let _guard = self.locks.acquire(&thread_id).await;
        let mut tracker = PhaseTracker::new(&thread_id);

        let mut state = self.store.load(&thread_id).await?.unwrap_or_default();
        state.begin_turn(&request.message, request.document_content.as_deref());

        tracker.advance();
        let classification = self.classify(&request.message, &state.document_content).await?;
        let context = context::extract(classification.intent, &request.message)
            .carry_over(&state.company_insights);
        state.set_context(context.clone());
        state.messages.push(Message::system(
            format!(
                "Intent classified as: {} (confidence: {:.2})",
                classification.intent, classification.confidence
            ),
            classification.intent,
        ));

        tracker.advance();
        let handler = self.router.resolve(classification.intent.as_str())?;

        tracker.advance();
        let outcome = handler
            .respond(HandlerInput {
                document: &state.document_content,
                context: &context,
                query: &request.message,
            })
            .await;
        let context = apply_outcome(&mut state, classification.intent, context, &outcome);

        tracker.advance();
        if self.retention.exceeded(&state) {
            warn!(
                "Session {thread_id} exceeds retention caps ({} messages, {} versions); compaction recommended",
                state.messages.len(),
                state.document_versions.len()
            );
        }
        self.store.save(&thread_id, &state).await?;

        info!(
            "Turn {} for {thread_id} handled by {} (intent: {}, degraded: {})",
            state.turn_count,
            handler.name(),
            classification.intent,
            outcome.degraded.is_some()
        );

        Ok(TurnOutcome {
            thread_id,
            response: outcome.response,
            intent: classification.intent,
            confidence: classification.confidence,
            context,
            degraded: outcome.degraded,
        })
    }

    /// Applies the retention policy to a stored thread under its lock.
    /// Returns `None` when the thread has no checkpoint.
    pub async fn compact(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<CompactionReport>, PersistenceError> {
        let _guard = self.locks.acquire(thread_id).await;
        let Some(mut state) = self.store.load(thread_id).await? else {
            return Ok(None);
        };

        let report = self.retention.compact(&mut state);
        if !report.is_empty() {
            self.store.save(thread_id, &state).await?;
            info!(
                "Compacted {thread_id}: removed {} messages, {} versions",
                report.messages_removed, report.versions_removed
            );
        }
        Ok(Some(report))
    }

    async fn classify(
        &self,
        query: &str,
        document: &str,
    ) -> Result<Classification, ClassificationError> {
        match self.classifier.classify(query, document).await {
            Ok(classification) => Ok(classification),
            Err(e) if self.fallback == ClassificationFallback::Heuristic => {
                warn!("Classifier failed ({e}); falling back to keyword heuristic");
                Ok(classify_by_keywords(query))
            }
            Err(e) => Err(e),
        }
    }
}

/// Records the handler reply and applies its updates. Returns the context
/// now stored in the session.
fn apply_outcome(
    state: &mut SessionState,
    intent: Intent,
    context: Context,
    outcome: &HandlerOutcome,
) -> Context {
    state.last_response = outcome.response.clone();
    state
        .messages
        .push(Message::assistant(outcome.response.clone(), intent));

    if let Some(document) = outcome
        .updates
        .new_document
        .as_ref()
        .filter(|d| !d.trim().is_empty() && **d != state.document_content)
    {
        state.push_version(document.clone(), VersionSource::Agent(intent));
    }

    match &outcome.updates.context {
        Some(updated) if updated.intent() == intent => {
            state.set_context(updated.clone());
            updated.clone()
        }
        Some(updated) => {
            warn!(
                "Ignoring {} context update from a {intent} handler",
                updated.intent()
            );
            context
        }
        None => context,
    }
}
