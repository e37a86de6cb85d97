//! Supervisor routing
//!
//! Each turn starts with a forced `route` call that classifies the
//! customer's request into one of four targets. Classification is
//! model-driven; nothing in here matches on keywords.

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message, ToolDefinition};
use crate::prompts;
use serde::Deserialize;
use std::sync::Arc;

/// Which sub-agent a routed step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Billing and purchase history
    Invoice,
    /// Music catalog
    Music,
}

/// Routing target for one customer turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteTarget {
    /// Billing or purchase-history request
    Invoice,
    /// Music catalog request
    Music,
    /// Mixed request touching both domains
    Both,
    /// Small talk or out-of-scope
    Neither,
}

impl RouteTarget {
    /// Whether this target touches account data and so requires a
    /// verified identity
    pub fn needs_identity(&self) -> bool {
        matches!(self, RouteTarget::Invoice | RouteTarget::Both)
    }
}

/// Where a routed turn stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Classification has not happened yet
    AwaitingRoute,
    /// The invoice sub-agent runs next
    InvoiceActive,
    /// The music sub-agent runs next
    MusicActive,
    /// No sub-agent left to run
    Done,
}

/// Deterministic execution plan for one classified turn.
///
/// Mixed requests run the invoice agent before the music agent; the
/// caller concatenates replies in the order [`advance`](Self::advance)
/// yields them.
#[derive(Debug, Clone, Copy)]
pub struct TurnPlan {
    target: Option<RouteTarget>,
    state: TurnState,
}

impl Default for TurnPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnPlan {
    /// A fresh plan waiting on classification
    pub fn new() -> Self {
        Self {
            target: None,
            state: TurnState::AwaitingRoute,
        }
    }

    /// Record the classification and move to the first active state
    pub fn route(&mut self, target: RouteTarget) {
        self.target = Some(target);
        self.state = match target {
            RouteTarget::Invoice | RouteTarget::Both => TurnState::InvoiceActive,
            RouteTarget::Music => TurnState::MusicActive,
            RouteTarget::Neither => TurnState::Done,
        };
    }

    /// The classification, once routed
    pub fn target(&self) -> Option<RouteTarget> {
        self.target
    }

    /// Current state
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Whether any sub-agent remains to run
    pub fn is_done(&self) -> bool {
        self.state == TurnState::Done
    }

    /// Step to the next sub-agent, or `None` once the plan is done
    pub fn advance(&mut self) -> Option<AgentKind> {
        match self.state {
            TurnState::AwaitingRoute | TurnState::Done => None,
            TurnState::InvoiceActive => {
                self.state = match self.target {
                    Some(RouteTarget::Both) => TurnState::MusicActive,
                    _ => TurnState::Done,
                };
                Some(AgentKind::Invoice)
            }
            TurnState::MusicActive => {
                self.state = TurnState::Done;
                Some(AgentKind::Music)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteArguments {
    target: RouteTarget,
}

/// Classifies each turn into a [`RouteTarget`]
pub struct Router {
    client: Arc<dyn LlmClient>,
    model: ModelConfig,
}

impl Router {
    /// Create a new router
    pub fn new(client: Arc<dyn LlmClient>, model: ModelConfig) -> Self {
        Self { client, model }
    }

    fn route_function() -> ToolDefinition {
        ToolDefinition::function(
            "route",
            "Classify the customer's latest request",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "target": {
                        "type": "string",
                        "enum": ["invoice", "music", "both", "neither"],
                        "description": "Which specialist should handle the request"
                    }
                },
                "required": ["target"]
            }),
        )
    }

    /// Classify the latest customer request against the conversation so
    /// far
    pub async fn classify(&self, conversation: &[Message]) -> Result<RouteTarget> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(prompts::ROUTER_PROMPT));
        messages.extend_from_slice(conversation);

        let request = CompletionRequest::new(&self.model.model, messages)
            .with_temperature(self.model.temperature)
            .forcing_function(Self::route_function());

        let response = self.client.complete(request).await?;
        let arguments: RouteArguments = response
            .function_arguments()
            .map_err(|e| Error::openrouter(format!("routing reply unusable: {}", e)))?;

        tracing::debug!(target = ?arguments.target, "turn routed");
        Ok(arguments.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{text_response, tool_call_response, ScriptedClient};

    fn router_with(client: ScriptedClient) -> Router {
        Router::new(Arc::new(client), ModelConfig::new("openai/gpt-4o-mini"))
    }

    #[tokio::test]
    async fn classifies_each_target() {
        for (label, expected) in [
            ("invoice", RouteTarget::Invoice),
            ("music", RouteTarget::Music),
            ("both", RouteTarget::Both),
            ("neither", RouteTarget::Neither),
        ] {
            let client = ScriptedClient::new(vec![tool_call_response(
                "route",
                serde_json::json!({ "target": label }),
            )]);
            let target = router_with(client)
                .classify(&[Message::user("hello")])
                .await
                .unwrap();
            assert_eq!(target, expected);
        }
    }

    #[tokio::test]
    async fn classification_request_pins_the_route_function() {
        let client = Arc::new(ScriptedClient::new(vec![tool_call_response(
            "route",
            serde_json::json!({ "target": "music" }),
        )]));
        let router = Router::new(client.clone(), ModelConfig::new("openai/gpt-4o-mini"));
        router
            .classify(&[Message::user("any Rolling Stones albums?")])
            .await
            .unwrap();

        let body = serde_json::to_value(client.request(0)).unwrap();
        assert_eq!(body["tool_choice"]["function"]["name"], "route");
    }

    #[tokio::test]
    async fn free_text_reply_is_an_error() {
        let client = ScriptedClient::new(vec![text_response("music, probably")]);
        let err = router_with(client)
            .classify(&[Message::user("any jazz?")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OpenRouter(_)));
    }

    #[tokio::test]
    async fn unknown_target_is_an_error() {
        let client = ScriptedClient::new(vec![tool_call_response(
            "route",
            serde_json::json!({ "target": "weather" }),
        )]);
        let err = router_with(client)
            .classify(&[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OpenRouter(_)));
    }

    #[test]
    fn mixed_requests_run_invoice_before_music() {
        let mut plan = TurnPlan::new();
        assert_eq!(plan.state(), TurnState::AwaitingRoute);
        assert!(plan.advance().is_none());

        plan.route(RouteTarget::Both);
        assert_eq!(plan.advance(), Some(AgentKind::Invoice));
        assert_eq!(plan.advance(), Some(AgentKind::Music));
        assert_eq!(plan.advance(), None);
        assert!(plan.is_done());
    }

    #[test]
    fn single_target_plans_run_one_agent() {
        let mut plan = TurnPlan::new();
        plan.route(RouteTarget::Music);
        assert_eq!(plan.advance(), Some(AgentKind::Music));
        assert!(plan.is_done());

        let mut plan = TurnPlan::new();
        plan.route(RouteTarget::Neither);
        assert!(plan.is_done());
        assert!(plan.advance().is_none());
    }

    #[test]
    fn identity_is_required_for_account_targets() {
        assert!(RouteTarget::Both.needs_identity());
        assert!(RouteTarget::Invoice.needs_identity());
        assert!(!RouteTarget::Music.needs_identity());
        assert!(!RouteTarget::Neither.needs_identity());
    }
}
