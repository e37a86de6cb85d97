//! OpenRouter API client and chat-completion wire types

use crate::config::OpenRouterConfig;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::types::TokenUsage;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};

/// OpenRouter API client
pub struct OpenRouterClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = OpenRouterConfig::from_env()?;
        Self::new(config)
    }

    /// Create a new OpenRouter client with the given configuration
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    /// Send a completion request
    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.as_str().trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("X-Title", &self.config.app_name)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::openrouter(format!(
                "Request failed with status {}: {}",
                status, error_text
            )));
        }

        let completion: CompletionResponse = response.json().await?;
        Ok(completion)
    }

    /// Get the configuration
    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        OpenRouterClient::complete(self, request).await
    }

    fn client_type(&self) -> &str {
        "openrouter"
    }

    fn endpoint(&self) -> &str {
        self.config.base_url.as_str()
    }
}

/// Completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens for completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tools available to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Tool choice behavior
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            tools: None,
            tool_choice: None,
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the tools
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set the tool choice
    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    /// Force the model to call exactly one named function.
    ///
    /// This is the constrained-extraction call shape: the model must reply
    /// with a call to `function`, whose arguments carry the typed fields.
    pub fn forcing_function(mut self, function: ToolDefinition) -> Self {
        let name = function.function.name.clone();
        self.tools = Some(vec![function]);
        self.tool_choice = Some(ToolChoice::function(name));
        self
    }
}

// Tool-call replies carry null content.
fn null_to_empty<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    #[serde(default, deserialize_with = "null_to_empty")]
    pub content: String,
    /// Optional tool calls (for assistant messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Optional tool call ID (for tool messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a tool-result message
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool message
    Tool,
}

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    /// Create a function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Function definition for tool calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// Function description
    pub description: String,
    /// JSON Schema for parameters
    pub parameters: serde_json::Value,
}

/// Tool choice behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// "auto" / "none" / "required"
    Mode(String),
    /// Specific function
    Function {
        /// Always "function"
        #[serde(rename = "type")]
        choice_type: String,
        /// Function to call
        function: FunctionChoice,
    },
}

impl ToolChoice {
    /// Model decides whether to call a tool
    pub fn auto() -> Self {
        Self::Mode("auto".to_string())
    }

    /// Model must call the named function
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function {
            choice_type: "function".to_string(),
            function: FunctionChoice { name: name.into() },
        }
    }
}

/// Specific function choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionChoice {
    /// Function name
    pub name: String,
}

/// Tool call from the assistant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call ID
    pub id: String,
    /// Type (always "function")
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionCall,
}

/// Function call details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Function arguments (JSON string)
    pub arguments: String,
}

/// Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Unique identifier
    #[serde(default)]
    pub id: String,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Choices
    pub choices: Vec<Choice>,
    /// Token usage
    #[serde(default)]
    pub usage: Usage,
}

impl CompletionResponse {
    /// Text content of the first choice, if any
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .filter(|c| !c.trim().is_empty())
    }

    /// Tool calls requested by the first choice
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.choices
            .first()
            .and_then(|c| c.message.tool_calls.as_deref())
            .unwrap_or_default()
    }

    /// Parse the arguments of a forced function call into `T`.
    ///
    /// Used by the constrained-extraction call shape; fails when the model
    /// answered with free text instead of the required call.
    pub fn function_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let call = self
            .tool_calls()
            .first()
            .ok_or_else(|| Error::openrouter("expected a function call in the response"))?;
        Ok(serde_json::from_str(&call.function.arguments)?)
    }
}

/// Choice in completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Index of the choice
    #[serde(default)]
    pub index: u32,
    /// Message content
    pub message: Message,
    /// Finish reason
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Completion tokens
    #[serde(default)]
    pub completion_tokens: u64,
    /// Total tokens
    #[serde(default)]
    pub total_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenRouterConfig;
    use url::Url;

    fn sample_tool_call_response() -> &'static str {
        r#"{
            "id": "gen-1",
            "model": "openai/gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "record_identifier",
                            "arguments": "{\"identifier\": \"luisg@embraer.com.br\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52}
        }"#
    }

    #[test]
    fn deserializes_null_content_with_tool_calls() {
        let response: CompletionResponse =
            serde_json::from_str(sample_tool_call_response()).unwrap();
        assert!(response.content().is_none());
        assert_eq!(response.tool_calls().len(), 1);
        assert_eq!(response.tool_calls()[0].function.name, "record_identifier");
    }

    #[test]
    fn function_arguments_parse_into_typed_struct() {
        #[derive(serde::Deserialize)]
        struct Extracted {
            identifier: String,
        }

        let response: CompletionResponse =
            serde_json::from_str(sample_tool_call_response()).unwrap();
        let parsed: Extracted = response.function_arguments().unwrap();
        assert_eq!(parsed.identifier, "luisg@embraer.com.br");
    }

    #[test]
    fn forcing_function_pins_tool_choice() {
        let request = CompletionRequest::new("openai/gpt-4o-mini", vec![Message::user("hi")])
            .forcing_function(ToolDefinition::function(
                "route",
                "Pick a target",
                serde_json::json!({"type": "object"}),
            ));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["tool_choice"]["function"]["name"], "route");
        assert_eq!(body["tools"][0]["function"]["name"], "route");
    }

    #[tokio::test]
    async fn complete_posts_to_chat_completions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(sample_tool_call_response())
            .create_async()
            .await;

        let config = OpenRouterConfig::new("test-key")
            .with_base_url(Url::parse(&server.url()).unwrap());
        let client = OpenRouterClient::new(config).unwrap();

        let response = client
            .complete(CompletionRequest::new(
                "openai/gpt-4o-mini",
                vec![Message::user("my email is luisg@embraer.com.br")],
            ))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.usage.total_tokens, 52);
    }

    #[tokio::test]
    async fn complete_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("{\"error\": \"bad key\"}")
            .create_async()
            .await;

        let config = OpenRouterConfig::new("bad-key")
            .with_base_url(Url::parse(&server.url()).unwrap());
        let client = OpenRouterClient::new(config).unwrap();

        let err = client
            .complete(CompletionRequest::new("openai/gpt-4o-mini", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OpenRouter(_)));
    }
}
