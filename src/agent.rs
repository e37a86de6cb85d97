//! Tool-calling sub-agents
//!
//! A sub-agent owns a set of catalog tools and runs a bounded
//! completion/tool-execution loop against them. Tool failures are fed back
//! to the model as error results so it can retry or rephrase; the loop cap
//! bounds how long that can go on.

use crate::catalog::CatalogStore;
use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message, ToolChoice};
use crate::tools::{invoice_tools, music_tools, Tool, ToolContext};
use crate::types::TokenUsage;
use std::sync::Arc;

/// Default cap on completion/tool rounds per sub-agent run
pub const DEFAULT_MAX_LOOPS: u32 = 8;

/// A tool-calling sub-agent
pub struct SubAgent {
    name: String,
    client: Arc<dyn LlmClient>,
    model: ModelConfig,
    tools: Vec<Arc<dyn Tool>>,
    max_loops: u32,
}

impl SubAgent {
    /// Start building a sub-agent
    pub fn builder(name: impl Into<String>) -> SubAgentBuilder {
        SubAgentBuilder::new(name)
    }

    /// The agent's name, used in logs and routing
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the tool loop for one request.
    ///
    /// `system_prompt` is built per turn by the caller so it can carry the
    /// customer's preference context. The loop ends when the model replies
    /// with text instead of tool calls; exceeding the cap is fatal for the
    /// turn.
    pub async fn respond(
        &self,
        system_prompt: &str,
        conversation: &[Message],
        ctx: &ToolContext,
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(system_prompt));
        messages.extend_from_slice(conversation);

        let definitions: Vec<_> = self.tools.iter().map(|t| t.to_definition()).collect();
        let mut usage = TokenUsage::default();

        for round in 0..self.max_loops {
            let request = CompletionRequest::new(&self.model.model, messages.clone())
                .with_temperature(self.model.temperature)
                .with_tools(definitions.clone())
                .with_tool_choice(ToolChoice::auto());

            let response = self.client.complete(request).await?;
            usage.add(response.usage.clone().into());
            let reply = response
                .choices
                .first()
                .map(|c| c.message.clone())
                .ok_or_else(|| Error::openrouter("completion returned no choices"))?;

            let calls = reply.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() {
                let content = reply.content.trim();
                if content.is_empty() {
                    return Err(Error::openrouter("completion had neither text nor tool calls"));
                }
                tracing::debug!(
                    agent = %self.name,
                    rounds = round + 1,
                    total_tokens = usage.total_tokens,
                    "sub-agent finished"
                );
                return Ok(content.to_string());
            }

            messages.push(reply);
            for call in calls {
                let result = self.execute_call(&call.function.name, &call.function.arguments, ctx).await;
                messages.push(Message::tool(result, call.id));
            }
        }

        tracing::warn!(
            agent = %self.name,
            cap = self.max_loops,
            total_tokens = usage.total_tokens,
            "tool loop cap exceeded"
        );
        Err(Error::LoopCapExceeded(self.max_loops))
    }

    async fn execute_call(&self, name: &str, arguments: &str, ctx: &ToolContext) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.id() == name) else {
            tracing::warn!(agent = %self.name, tool = name, "model called an unknown tool");
            return format!("Error: no tool named '{}' is available.", name);
        };

        let params: serde_json::Value = match serde_json::from_str(arguments) {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!(agent = %self.name, tool = name, error = %e, "malformed tool arguments");
                return "Error: the tool arguments were not valid JSON.".to_string();
            }
        };

        tracing::debug!(agent = %self.name, tool = name, "executing tool");
        match tool.execute(params, ctx).await {
            Ok(output) => output.content,
            Err(e) => {
                tracing::warn!(agent = %self.name, tool = name, error = %e, "tool execution failed");
                format!("Error: {}", e.user_message())
            }
        }
    }
}

/// Builder for [`SubAgent`]
pub struct SubAgentBuilder {
    name: String,
    client: Option<Arc<dyn LlmClient>>,
    model: Option<ModelConfig>,
    tools: Vec<Arc<dyn Tool>>,
    max_loops: u32,
}

impl SubAgentBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client: None,
            model: None,
            tools: Vec::new(),
            max_loops: DEFAULT_MAX_LOOPS,
        }
    }

    /// Set the completion client
    pub fn client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the model configuration
    pub fn model(mut self, model: ModelConfig) -> Self {
        self.model = Some(model);
        self
    }

    /// Add a tool
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Add several tools
    pub fn tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Override the tool-loop cap
    pub fn max_loops(mut self, max_loops: u32) -> Self {
        self.max_loops = max_loops;
        self
    }

    /// Build the agent
    pub fn build(self) -> Result<SubAgent> {
        let client = self
            .client
            .ok_or_else(|| Error::config("sub-agent requires a client"))?;
        let model = self
            .model
            .ok_or_else(|| Error::config("sub-agent requires a model"))?;
        if self.tools.is_empty() {
            return Err(Error::config("sub-agent requires at least one tool"));
        }
        Ok(SubAgent {
            name: self.name,
            client,
            model,
            tools: self.tools,
            max_loops: self.max_loops,
        })
    }
}

/// Sub-agent for billing and purchase-history questions
pub fn invoice_agent(
    client: Arc<dyn LlmClient>,
    model: ModelConfig,
    store: &CatalogStore,
) -> Result<SubAgent> {
    SubAgent::builder("invoice")
        .client(client)
        .model(model)
        .tools(invoice_tools(store))
        .build()
}

/// Sub-agent for music catalog questions
pub fn music_agent(
    client: Arc<dyn LlmClient>,
    model: ModelConfig,
    store: &CatalogStore,
) -> Result<SubAgent> {
    SubAgent::builder("music")
        .client(client)
        .model(model)
        .tools(music_tools(store))
        .build()
}
