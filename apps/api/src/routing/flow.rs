//! Turn execution: classify, plan, then run phases strictly in order.
//!
//! Each phase builds a complete `SessionPatch` before anything is written, so a
//! failing phase commits nothing. Phases that already succeeded stay committed.
//! After a failure the rest of the plan is skipped and one error message is
//! appended to the conversation.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::classifier::{ClassifierInput, QueryClassifier};
use super::discussion::{collect_evidence, DiscussionContext, DiscussionResponder};
use super::job_description::{job_description_markdown, JobSpecExtractor};
use super::plan::{resolve_plan, ExecutionPlan, PlanContext, RouterPolicy};
use super::HISTORY_LIMIT;
use crate::errors::AppError;
use crate::knowledge::{CorpusStore, SessionLease, SessionStore};
use crate::models::{Message, Phase, RankingConfigPatch, Session, SessionPatch};
use crate::ranking::{screening_markdown, RankingEngine};

/// Where the state machine is within one turn. Starts at `Idle`, ends at `Terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingJobSpec,
    AwaitingScreening,
    AwaitingDiscussion,
    Terminal,
}

impl TurnState {
    fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::JobDescription => TurnState::AwaitingJobSpec,
            Phase::Screening => TurnState::AwaitingScreening,
            Phase::Discussion => TurnState::AwaitingDiscussion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session: Session,
    pub plan: Vec<Phase>,
    pub completed: Vec<Phase>,
    /// Assistant messages appended this turn, in order.
    pub new_messages: Vec<Message>,
    pub status: TurnStatus,
    pub error: Option<TurnError>,
}

pub struct PhaseRouter {
    classifier: Arc<dyn QueryClassifier>,
    job_spec: Arc<dyn JobSpecExtractor>,
    responder: Arc<dyn DiscussionResponder>,
    ranking: Arc<RankingEngine>,
    corpus: Arc<CorpusStore>,
    policy: RouterPolicy,
}

impl PhaseRouter {
    pub fn new(
        classifier: Arc<dyn QueryClassifier>,
        job_spec: Arc<dyn JobSpecExtractor>,
        responder: Arc<dyn DiscussionResponder>,
        ranking: Arc<RankingEngine>,
        corpus: Arc<CorpusStore>,
        policy: RouterPolicy,
    ) -> Self {
        Self {
            classifier,
            job_spec,
            responder,
            ranking,
            corpus,
            policy,
        }
    }

    /// Runs one user turn against the leased session.
    ///
    /// Returns `Err` only when even the error message cannot be persisted;
    /// capability failures are reported in the outcome.
    pub async fn run_turn(
        &self,
        store: &SessionStore,
        lease: &SessionLease,
        text: &str,
    ) -> Result<TurnOutcome, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Message must not be empty".into()));
        }

        let mut session = store
            .update(lease, SessionPatch::messages(vec![Message::user(text)]))
            .await?;
        // Capabilities get the current message separately; history ends before it.
        let turn_start = session.messages.len().saturating_sub(1);
        let mut outcome = TurnOutcome {
            session: session.clone(),
            plan: Vec::new(),
            completed: Vec::new(),
            new_messages: Vec::new(),
            status: TurnStatus::Ok,
            error: None,
        };

        let plan = match self.plan_turn(&session, text, turn_start).await {
            Ok(plan) => plan,
            Err(e) => return self.fail(store, lease, outcome, None, e).await,
        };
        outcome.plan = plan.phases().to_vec();

        let mut state = TurnState::Idle;
        for &phase in plan.phases() {
            let next = TurnState::for_phase(phase);
            debug!(session_id = %session.id, from = ?state, to = ?next, "Turn state transition");
            state = next;

            let patch = match self.execute(phase, &session, text, turn_start, &plan).await {
                Ok(patch) => patch,
                Err(e) => return self.fail(store, lease, outcome, Some(phase), e).await,
            };
            let assistant: Vec<Message> = patch.append_messages.clone();
            session = match store.update(lease, patch).await {
                Ok(session) => session,
                Err(e) => return self.fail(store, lease, outcome, Some(phase), e).await,
            };
            outcome.new_messages.extend(assistant);
            outcome.completed.push(phase);
            outcome.session = session.clone();
        }

        state = TurnState::Terminal;
        debug!(session_id = %session.id, ?state, "Turn finished");
        info!(
            session_id = %session.id,
            phases = ?outcome.completed,
            "Turn completed"
        );
        Ok(outcome)
    }

    async fn plan_turn(
        &self,
        session: &Session,
        text: &str,
        turn_start: usize,
    ) -> Result<ExecutionPlan, AppError> {
        let context = PlanContext::from_session(session);
        let history = session.history_before(turn_start, HISTORY_LIMIT);
        let decision = self
            .classifier
            .classify(ClassifierInput {
                message: text,
                history,
                context,
                ranking_config: &session.ranking_config,
            })
            .await?;

        let plan = resolve_plan(&decision, &context, &self.policy);
        for adjustment in &plan.adjustments {
            warn!(session_id = %session.id, "Router adjusted classifier plan: {adjustment}");
        }
        info!(
            session_id = %session.id,
            plan = ?plan.phases(),
            new_job_search = plan.flags.new_job_search,
            screen_again = plan.flags.screen_again,
            allow_jd_incomplete = plan.flags.allow_jd_incomplete,
            "Execution plan resolved"
        );
        Ok(plan)
    }

    /// Runs one phase against the current session and returns its complete patch.
    async fn execute(
        &self,
        phase: Phase,
        session: &Session,
        text: &str,
        turn_start: usize,
        plan: &ExecutionPlan,
    ) -> Result<SessionPatch, AppError> {
        let history = session.history_before(turn_start, HISTORY_LIMIT);
        match phase {
            Phase::JobDescription => {
                let reset = plan.flags.new_job_search;
                let current = if reset {
                    None
                } else {
                    session.job_snapshot.as_ref()
                };
                let snapshot = self
                    .job_spec
                    .extract(current, text, history)
                    .await?
                    .normalized();
                let message = job_description_markdown(&snapshot, reset);
                Ok(SessionPatch {
                    append_messages: vec![Message::assistant(phase, message)],
                    job_snapshot: Some(Some(snapshot)),
                    screening_result: reset.then_some(None),
                    ..Default::default()
                })
            }
            Phase::Screening => {
                let config = match plan.top_k_hint {
                    Some(hint) => match RankingConfigPatch::top_k(hint).merged(&session.ranking_config) {
                        Ok(config) => Some(config),
                        Err(e) => {
                            warn!(session_id = %session.id, "Ignoring top_k hint {hint}: {e}");
                            None
                        }
                    },
                    None => None,
                };
                let effective = config.unwrap_or(session.ranking_config);
                let job = session.job_snapshot.clone().unwrap_or_default();
                let corpus = self.corpus.snapshot().await;
                let result = self.ranking.rank(&job, &effective, &corpus).await?;
                let message = screening_markdown(&result);
                Ok(SessionPatch {
                    append_messages: vec![Message::assistant(phase, message)],
                    ranking_config: config,
                    screening_result: Some(Some(result)),
                    ..Default::default()
                })
            }
            Phase::Discussion => {
                let evidence = match &session.screening_result {
                    Some(result) => collect_evidence(&*self.corpus.snapshot().await, result),
                    None => Vec::new(),
                };
                let reply = self
                    .responder
                    .respond(DiscussionContext {
                        message: text,
                        history,
                        job_snapshot: session.job_snapshot.as_ref(),
                        screening: session.screening_result.as_ref(),
                        evidence: &evidence,
                    })
                    .await?;
                let mut message = reply.to_markdown();
                if message.trim().is_empty() {
                    message = "I don't have anything to add to that yet.".to_string();
                }
                Ok(SessionPatch::messages(vec![Message::assistant(phase, message)]))
            }
        }
    }

    /// Records a turn failure as one assistant error message and ends the turn.
    async fn fail(
        &self,
        store: &SessionStore,
        lease: &SessionLease,
        mut outcome: TurnOutcome,
        phase: Option<Phase>,
        err: AppError,
    ) -> Result<TurnOutcome, AppError> {
        let stage = phase.map(|p| p.as_str()).unwrap_or("routing");
        error!(session_id = %lease.id(), stage, "Turn aborted: {err}");

        let message = Message::error(phase, user_facing(&err, stage));
        let session = store
            .update(lease, SessionPatch::messages(vec![message.clone()]))
            .await?;

        outcome.session = session;
        outcome.new_messages.push(message);
        outcome.status = TurnStatus::Error;
        outcome.error = Some(TurnError {
            code: err.code().to_string(),
            message: err.to_string(),
            phase,
        });
        Ok(outcome)
    }
}

fn user_facing(err: &AppError, stage: &str) -> String {
    let detail = match err {
        AppError::Upstream(_) => "An AI service did not respond successfully. Please try again.",
        AppError::Storage(_) => "Your conversation could not be saved. Please try again.",
        AppError::Validation(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => msg,
        AppError::Internal(_) => "Something went wrong on our side.",
    };
    format!("⚠️ I couldn't complete the {} step. {detail}", stage.replace('_', " "))
}
