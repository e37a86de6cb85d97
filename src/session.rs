//! Conversation sessions
//!
//! A session owns one customer conversation: the message history, the
//! verified identity (once bound), and the per-turn pipeline of routing,
//! identity gating, sub-agent runs, and preference writes.
//!
//! Identity gating is a suspension, not an in-process wait: when a turn
//! needs account data and no identity is bound, the session records the
//! pending request, answers with a reprompt, and resumes on the turn that
//! supplies a usable identifier. The suspended phase is serializable so a
//! host can park the session between turns.

use crate::agent::{invoice_agent, music_agent, SubAgent};
use crate::catalog::CatalogStore;
use crate::config::ModelConfig;
use crate::error::Result;
use crate::llm_client::LlmClient;
use crate::memory::{MemoryWriter, PreferenceStore};
use crate::openrouter::{CompletionRequest, Message};
use crate::prompts;
use crate::router::{AgentKind, Router, TurnPlan};
use crate::tools::ToolContext;
use crate::types::{CustomerId, SessionId, TurnId};
use crate::verify::{VerificationGate, VerifyOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where a session stands between turns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    /// Accepting new requests
    Ready,
    /// Suspended on the identity gate; `pending_query` is the request that
    /// triggered it and resumes once an identifier verifies
    AwaitingIdentifier {
        /// The request waiting on verification
        pending_query: String,
    },
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The request was answered
    Answered,
    /// The session suspended on the identity gate
    AwaitingIdentifier,
}

/// Result of one customer turn
#[derive(Debug)]
pub struct TurnOutcome {
    reply: String,
    status: TurnStatus,
}

impl TurnOutcome {
    /// The text to show the customer
    pub fn reply(&self) -> &str {
        &self.reply
    }

    /// How the turn ended
    pub fn status(&self) -> TurnStatus {
        self.status
    }
}

/// One customer conversation
pub struct Session {
    id: SessionId,
    client: Arc<dyn LlmClient>,
    model: ModelConfig,
    router: Router,
    gate: VerificationGate,
    invoice: SubAgent,
    music: SubAgent,
    memory: Arc<PreferenceStore>,
    writer: MemoryWriter,
    history: Vec<Message>,
    customer: Option<CustomerId>,
    phase: SessionPhase,
}

impl Session {
    /// Create a session over a loaded catalog
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: ModelConfig,
        store: CatalogStore,
        memory: Arc<PreferenceStore>,
    ) -> Result<Self> {
        Ok(Self {
            id: SessionId::new(),
            router: Router::new(client.clone(), model.clone()),
            gate: VerificationGate::new(store.clone(), client.clone(), model.clone()),
            invoice: invoice_agent(client.clone(), model.clone(), &store)?,
            music: music_agent(client.clone(), model.clone(), &store)?,
            writer: MemoryWriter::new(client.clone(), model.clone()),
            client,
            model,
            memory,
            history: Vec::new(),
            customer: None,
            phase: SessionPhase::Ready,
        })
    }

    /// Session identifier
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The verified customer, once the gate has bound one
    pub fn customer(&self) -> Option<CustomerId> {
        self.customer
    }

    /// Current phase
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Message history so far
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Drop the conversation and bound identity, keeping stored
    /// preference profiles intact
    pub fn reset(&mut self) {
        self.history.clear();
        self.customer = None;
        self.phase = SessionPhase::Ready;
    }

    /// Process one customer message
    pub async fn handle_turn(&mut self, input: &str) -> Result<TurnOutcome> {
        let turn = TurnId::new();
        tracing::debug!(session = %self.id, %turn, "handling turn");

        self.history.push(Message::user(input));

        // A suspended session spends every turn on the gate until an
        // identifier verifies.
        let suspended = match &self.phase {
            SessionPhase::AwaitingIdentifier { pending_query } => Some(pending_query.clone()),
            SessionPhase::Ready => None,
        };
        if let Some(pending) = suspended {
            match self.gate.verify(&self.history).await? {
                VerifyOutcome::Verified {
                    customer,
                    confirmation,
                } => {
                    tracing::info!(%customer, "identity verified, resuming");
                    self.customer = Some(customer);
                    self.history.push(confirmation);
                    self.phase = SessionPhase::Ready;
                    return self.run_routed_turn(Some(pending)).await;
                }
                VerifyOutcome::Reprompt { reply } => {
                    return Ok(self.suspend_reply(reply));
                }
            }
        }

        self.run_routed_turn(None).await
    }

    /// Classify and answer the turn. On a resume, `pending` carries the
    /// request that was suspended on the gate, so routing targets that
    /// request rather than the identifier message that unblocked it.
    async fn run_routed_turn(&mut self, pending: Option<String>) -> Result<TurnOutcome> {
        // The profile is loaded before routing and exposed as read-only
        // context; it never influences tool execution directly.
        let preference_context = self
            .customer
            .map(|c| self.memory.loaded_context(c))
            .unwrap_or_default();

        let mut routed_view = self.history.clone();
        if !preference_context.is_empty() {
            routed_view.push(Message::system(format!(
                "Saved customer preferences: {}",
                preference_context
            )));
        }
        if let Some(pending) = &pending {
            routed_view.push(Message::system(format!(
                "The customer has verified their identity. Their pending request is: {}",
                pending
            )));
        }

        let mut plan = TurnPlan::new();
        let target = self.router.classify(&routed_view).await?;
        plan.route(target);

        if plan.is_done() {
            let reply = self.small_talk().await?;
            return Ok(self.answer(reply).await);
        }

        // Account data needs a verified identity; catalog-only requests
        // go straight through.
        if target.needs_identity() && self.customer.is_none() {
            match self.gate.verify(&self.history).await? {
                VerifyOutcome::Verified {
                    customer,
                    confirmation,
                } => {
                    tracing::info!(%customer, "identity verified inline");
                    self.customer = Some(customer);
                    self.history.push(confirmation);
                }
                VerifyOutcome::Reprompt { reply } => {
                    let pending = self.latest_user_message();
                    tracing::info!("suspending on identity gate");
                    self.phase = SessionPhase::AwaitingIdentifier {
                        pending_query: pending,
                    };
                    return Ok(self.suspend_reply(reply));
                }
            }
        }

        // The gate may have bound an identity just now; pick up that
        // customer's saved preferences for the agents.
        let preference_context = self
            .customer
            .map(|c| self.memory.loaded_context(c))
            .unwrap_or_default();

        let mut parts = Vec::new();
        while let Some(step) = plan.advance() {
            let part = match step {
                AgentKind::Invoice => {
                    let customer = self
                        .customer
                        .ok_or(crate::error::Error::IdentityNotBound)?;
                    self.invoice
                        .respond(
                            prompts::INVOICE_AGENT_PROMPT,
                            &self.history,
                            &ToolContext::bound(customer),
                        )
                        .await?
                }
                AgentKind::Music => {
                    let ctx = match self.customer {
                        Some(customer) => ToolContext::bound(customer),
                        None => ToolContext::unbound(),
                    };
                    self.music
                        .respond(
                            &prompts::music_agent_prompt(&preference_context),
                            &self.history,
                            &ctx,
                        )
                        .await?
                }
            };
            parts.push(part);
        }

        Ok(self.answer(parts.join("\n\n")).await)
    }

    /// Small talk and out-of-scope requests get a plain completion with
    /// no tools
    async fn small_talk(&self) -> Result<String> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(Message::system(prompts::SMALL_TALK_PROMPT));
        messages.extend_from_slice(&self.history);

        let request = CompletionRequest::new(&self.model.model, messages)
            .with_temperature(self.model.temperature);
        let response = self.client.complete(request).await?;
        Ok(response
            .content()
            .unwrap_or("I can help with your account or our music catalog. What can I do for you?")
            .to_string())
    }

    async fn answer(&mut self, reply: String) -> TurnOutcome {
        self.history.push(Message::assistant(reply.clone()));

        // Preference writes happen after the reply is settled; a failed
        // judgment never fails the turn.
        if let Some(customer) = self.customer {
            if let Err(e) = self.writer.observe(&self.memory, customer, &self.history).await {
                tracing::warn!(error = %e, "preference write failed");
            }
        }

        TurnOutcome {
            reply,
            status: TurnStatus::Answered,
        }
    }

    fn suspend_reply(&mut self, reply: String) -> TurnOutcome {
        self.history.push(Message::assistant(reply.clone()));
        TurnOutcome {
            reply,
            status: TurnStatus::AwaitingIdentifier,
        }
    }

    fn latest_user_message(&self) -> String {
        self.history
            .iter()
            .rev()
            .find(|m| m.role == crate::openrouter::Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}
