//! Core agent loop engine.
//!
//! Implements the agentic cycle: prompt -> model -> parse directives ->
//! dispatch (or park for approval) -> continue. The [`MailAgent`] ties
//! together a model client, the action registry and one [`AgentSession`].
//!
//! # Safety Guards
//!
//! - **Iteration cap**: stops after [`AgentConfig::max_iterations`] model
//!   round-trips with a partial answer and an explicit notice
//! - **Approval gate**: gated actions are parked, never executed inline
//! - **Action timeout**: each executor call has a deadline
//! - **Busy guard**: a second request on a session that is mid-cycle
//!   fails fast instead of interleaving turns

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::Instrument;

use super::prompt::{DEFAULT_PREAMBLE, PromptContext, build_prompt};
use super::types::{AgentConfig, AgentReply, StopReason};
use crate::actions::{
    ActionError, ActionOutput, ActionRegistry, ActionResult, ToolInvocation, truncate_output,
    validate_params,
};
use crate::approval::{ApprovalOutcome, Decision, PendingApproval};
use crate::error::{MailAgentError, Result};
use crate::llm::ModelClient;
use crate::observability::spans::*;
use crate::parser::parse_response;
use crate::session::{AgentSession, ToolStatus, Turn};

/// Notice appended when the iteration cap is hit.
pub const ITERATION_LIMIT_NOTICE: &str =
    "[iteration limit reached: stopped before the task was finished]";

/// Per-cycle counters reported in [`AgentReply`].
#[derive(Debug, Default)]
struct CycleStats {
    model_calls: u32,
    actions_run: u32,
}

impl CycleStats {
    fn reply(&self, text: String, stop: StopReason) -> AgentReply {
        AgentReply {
            text,
            stop,
            model_calls: self.model_calls,
            actions_run: self.actions_run,
            pending: None,
        }
    }
}

/// Email and calendar agent for one conversation.
///
/// The session is behind an async mutex that is held for the duration of
/// a cycle and released before returning. Nothing is held while an
/// approval waits for the user.
pub struct MailAgent {
    config: AgentConfig,
    model: Arc<dyn ModelClient>,
    registry: Arc<ActionRegistry>,
    session: Mutex<AgentSession>,
}

impl MailAgent {
    /// Create an agent with a fresh session.
    pub fn new(
        config: AgentConfig,
        model: Arc<dyn ModelClient>,
        registry: Arc<ActionRegistry>,
    ) -> Self {
        let session = AgentSession::new(config.memory_capacity);
        Self {
            config,
            model,
            registry,
            session: Mutex::new(session),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Run one cycle for a new user message.
    ///
    /// # Errors
    ///
    /// Returns [`MailAgentError::SessionBusy`] if a cycle is already running
    /// for this session. Model and action failures are reported in the
    /// returned [`AgentReply`], not as errors.
    pub async fn handle_message(&self, text: &str) -> Result<AgentReply> {
        let mut session = self.lock_session()?;
        session.memory.append(Turn::user(text.trim()));
        self.run_cycle(&mut session).await
    }

    /// Apply the user's decision on a pending approval and continue the
    /// conversation so the model can react to it.
    ///
    /// Approval dispatches the parked invocation exactly once. Rejection
    /// records a failure turn carrying the comment. An unknown or
    /// already-resolved id changes nothing and does not call the model.
    ///
    /// # Errors
    ///
    /// Returns [`MailAgentError::SessionBusy`] if a cycle is already running.
    pub async fn resolve_approval(&self, id: &str, decision: Decision) -> Result<AgentReply> {
        let mut session = self.lock_session()?;
        let span = tracing::info_span!(SPAN_APPROVAL_RESOLVE, { FIELD_APPROVAL_ID } = %id.trim());

        let mut stats = CycleStats::default();
        let resolved = async {
            match session.approvals.resolve(id, decision) {
                ApprovalOutcome::NotFound => {
                    tracing::info!("approval id not pending");
                    false
                }
                ApprovalOutcome::Approved(pending) => {
                    tracing::info!(action = %pending.invocation.action, "approved");
                    let result = self.dispatch(&pending.invocation).await;
                    stats.actions_run += 1;
                    self.record_result(&mut session, pending.invocation, result);
                    true
                }
                ApprovalOutcome::Rejected { pending, comment } => {
                    tracing::info!(action = %pending.invocation.action, "rejected");
                    self.record_result(
                        &mut session,
                        pending.invocation,
                        Err(ActionError::Rejected(comment)),
                    );
                    true
                }
            }
        }
        .instrument(span)
        .await;

        if !resolved {
            return Ok(stats.reply(
                format!("No pending approval with id {}.", id.trim()),
                StopReason::ApprovalNotFound,
            ));
        }

        let mut reply = self.run_cycle(&mut session).await?;
        reply.actions_run += stats.actions_run;
        Ok(reply)
    }

    /// Pending approvals, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`MailAgentError::SessionBusy`] while a cycle is running.
    pub fn pending_approvals(&self) -> Result<Vec<PendingApproval>> {
        Ok(self.lock_session()?.approvals.list().to_vec())
    }

    /// Clear memory, search results, contacts and pending approvals.
    ///
    /// # Errors
    ///
    /// Returns [`MailAgentError::SessionBusy`] while a cycle is running.
    pub fn reset(&self) -> Result<()> {
        self.lock_session()?.reset();
        tracing::info!("session reset");
        Ok(())
    }

    /// Run `f` against the session state.
    ///
    /// # Errors
    ///
    /// Returns [`MailAgentError::SessionBusy`] while a cycle is running.
    pub fn inspect<T>(&self, f: impl FnOnce(&AgentSession) -> T) -> Result<T> {
        let guard = self.lock_session()?;
        Ok(f(&guard))
    }

    fn lock_session(&self) -> Result<MutexGuard<'_, AgentSession>> {
        self.session.try_lock().map_err(|_| {
            MailAgentError::SessionBusy("still processing the previous request".to_owned())
        })
    }

    /// The main loop: runs until the model stops emitting directives, a
    /// gated action is parked, the model fails, or the cap is reached.
    async fn run_cycle(&self, session: &mut AgentSession) -> Result<AgentReply> {
        let mut stats = CycleStats::default();
        let mut partial = String::new();

        for iteration in 1..=self.config.max_iterations {
            let span = tracing::info_span!(
                SPAN_AGENT_CYCLE,
                { FIELD_ITERATION } = iteration,
                { FIELD_MAX_ITERATIONS } = self.config.max_iterations,
            );

            let step = self
                .run_iteration(session, &mut stats, &mut partial)
                .instrument(span)
                .await;
            if let Some(reply) = step {
                return Ok(reply);
            }
        }

        tracing::warn!(
            max_iterations = self.config.max_iterations,
            "iteration limit reached"
        );
        let text = if partial.is_empty() {
            ITERATION_LIMIT_NOTICE.to_owned()
        } else {
            format!("{partial}\n\n{ITERATION_LIMIT_NOTICE}")
        };
        session.memory.append(Turn::agent(text.clone()));
        Ok(stats.reply(text, StopReason::IterationLimit))
    }

    /// One model round-trip and the dispatches it triggers.
    ///
    /// Returns `Some` when the cycle must stop.
    async fn run_iteration(
        &self,
        session: &mut AgentSession,
        stats: &mut CycleStats,
        partial: &mut String,
    ) -> Option<AgentReply> {
        let prompt = build_prompt(&PromptContext {
            preamble: self.config.preamble.as_deref().unwrap_or(DEFAULT_PREAMBLE),
            registry: &self.registry,
            memory: &session.memory,
            recent_window: self.config.recent_window,
            now: Utc::now(),
        });

        let response = match self.call_model(&prompt, stats).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "model call failed");
                let text = format!("Sorry, I couldn't reach the language model: {e}");
                session.memory.append(Turn::agent(text.clone()));
                return Some(stats.reply(text, StopReason::ModelFailure));
            }
        };

        let parsed = parse_response(&response);
        if !parsed.has_invocations() {
            tracing::debug!("model replied without directives");
            session.memory.append(Turn::agent(parsed.residual.clone()));
            return Some(stats.reply(parsed.residual, StopReason::Complete));
        }

        if !parsed.residual.is_empty() {
            session.memory.append(Turn::agent(parsed.residual.clone()));
            *partial = parsed.residual;
        }

        let total = parsed.invocations.len();
        for (index, invocation) in parsed.invocations.into_iter().enumerate() {
            let Some(descriptor) = self.registry.lookup(&invocation.action) else {
                tracing::warn!(action = %invocation.action, "unknown action");
                let err = ActionError::UnknownAction(invocation.action.clone());
                self.record_result(session, invocation, Err(err));
                continue;
            };

            if !descriptor.requires_approval {
                let result = self.dispatch(&invocation).await;
                stats.actions_run += 1;
                self.record_result(session, invocation, result);
                continue;
            }

            let params = match validate_params(&descriptor, &invocation.params) {
                Ok(params) => params,
                Err(e) => {
                    self.record_result(session, invocation, Err(e));
                    continue;
                }
            };
            let invocation = ToolInvocation::new(descriptor.name.clone(), params);
            let description = descriptor.describe(&invocation.params);
            let pending = session.approvals.submit(invocation.clone(), description);
            tracing::info!(
                action = %descriptor.name,
                approval_id = %pending.id,
                "action parked for approval"
            );

            let skipped = total - index - 1;
            let mut note = format!(
                "waiting for user approval (id {}): {}",
                pending.id, pending.description
            );
            if skipped > 0 {
                note.push_str(&format!(
                    ". {skipped} later action(s) in this reply were not run; propose them again once this is resolved"
                ));
            }
            session
                .memory
                .append(Turn::tool_result(invocation, ToolStatus::Pending, note));

            let text = format!(
                "Approval needed to {}. Approve or reject request {}.",
                pending.description, pending.id
            );
            let mut reply = stats.reply(text, StopReason::ApprovalRequired);
            reply.pending = Some(pending);
            return Some(reply);
        }

        None
    }

    /// Call the model, retrying rate-limited failures with backoff.
    async fn call_model(&self, prompt: &str, stats: &mut CycleStats) -> Result<String> {
        let policy = &self.config.retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            let span = tracing::debug_span!(
                SPAN_MODEL_REQUEST,
                { FIELD_MODEL } = %self.model.name(),
                { FIELD_ATTEMPT } = attempt,
            );
            stats.model_calls += 1;
            match self.model.complete(prompt).instrument(span).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_rate_limited() && attempt < max_attempts => {
                    let delay = policy.delay_for_retry(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "model rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Validate and execute a single invocation with a timeout.
    async fn dispatch(&self, invocation: &ToolInvocation) -> ActionResult {
        let span = tracing::info_span!(SPAN_ACTION_DISPATCH, { FIELD_ACTION } = %invocation.action);
        async {
            let descriptor = self
                .registry
                .lookup(&invocation.action)
                .ok_or_else(|| ActionError::UnknownAction(invocation.action.clone()))?;
            let params = validate_params(&descriptor, &invocation.params)?;

            let secs = self.config.action_timeout_secs;
            tracing::info!("dispatching action");
            match tokio::time::timeout(
                Duration::from_secs(secs),
                descriptor.executor.execute(&params),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(timeout_secs = secs, "action timed out");
                    Err(ActionError::Timeout(secs))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Fold an action outcome into the session.
    fn record_result(
        &self,
        session: &mut AgentSession,
        invocation: ToolInvocation,
        result: ActionResult,
    ) {
        let (status, content) = match result {
            Ok(ActionOutput {
                text,
                search,
                contacts,
            }) => {
                if let Some(search) = search {
                    session.memory.set_last_search(search);
                }
                for contact in &contacts {
                    session
                        .memory
                        .record_contact(&contact.display_name, &contact.email);
                }
                (ToolStatus::Success, text)
            }
            Err(e) => {
                tracing::debug!(action = %invocation.action, kind = e.kind(), error = %e, "action failed");
                (ToolStatus::Failure, format!("{}: {e}", e.kind()))
            }
        };
        let (content, truncated) = truncate_output(&content, self.config.max_tool_output_bytes);
        if truncated {
            tracing::debug!(action = %invocation.action, "action output truncated");
        }
        session
            .memory
            .append(Turn::tool_result(invocation, status, content));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn mail_agent_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MailAgent>();
    }

    #[test]
    fn cycle_stats_build_replies() {
        let stats = CycleStats {
            model_calls: 2,
            actions_run: 1,
        };
        let reply = stats.reply("done".into(), StopReason::Complete);
        assert_eq!(reply.model_calls, 2);
        assert_eq!(reply.actions_run, 1);
        assert!(reply.pending.is_none());
        assert!(!reply.needs_approval());
    }
}
