//! Constrained identifier extraction and classification

use crate::config::ModelConfig;
use crate::error::Result;
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message, ToolDefinition};
use crate::prompts;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::OnceLock;

/// A candidate identifier classified by shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Numeric customer ID
    CustomerId(i64),
    /// Email address
    Email(String),
    /// Phone number, kept exactly as stated
    Phone(String),
}

/// Classify a raw identifier string by pattern.
///
/// Returns `None` when the text does not look like any supported
/// identifier; the gate re-asks without attempting a lookup in that case.
pub fn classify_identifier(raw: &str) -> Option<Identifier> {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    let phone_re = PHONE.get_or_init(|| {
        // Digits with optional +, spaces, dashes, dots, and parentheses.
        Regex::new(r"^\+?[0-9][0-9 ().\-]{4,}$").expect("valid phone regex")
    });

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.chars().all(|c| c.is_ascii_digit()) && raw.len() <= 6 {
        return raw.parse().ok().map(Identifier::CustomerId);
    }

    if raw.contains('@') && raw.contains('.') && !raw.contains(char::is_whitespace) {
        return Some(Identifier::Email(raw.to_string()));
    }

    if phone_re.is_match(raw) {
        return Some(Identifier::Phone(raw.to_string()));
    }

    None
}

#[derive(Debug, Deserialize)]
struct ExtractedIdentifier {
    #[serde(default)]
    identifier: String,
}

/// Extracts one account identifier from free text via a forced function
/// call
pub struct IdentifierExtractor {
    client: Arc<dyn LlmClient>,
    model: ModelConfig,
}

impl IdentifierExtractor {
    /// Create a new extractor
    pub fn new(client: Arc<dyn LlmClient>, model: ModelConfig) -> Self {
        Self { client, model }
    }

    fn extraction_function() -> ToolDefinition {
        ToolDefinition::function(
            "record_identifier",
            "Record the account identifier the customer provided, or an empty \
             string if they have not provided one",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "identifier": {
                        "type": "string",
                        "description": "Customer ID, email address, or phone number; \
                                        empty when not provided"
                    }
                },
                "required": ["identifier"]
            }),
        )
    }

    /// Extract and classify an identifier from the conversation so far.
    ///
    /// `Ok(None)` means no parseable identifier was present — an
    /// extraction miss, not an error.
    pub async fn extract(&self, conversation: &[Message]) -> Result<Option<Identifier>> {
        let mut messages = vec![Message::system(prompts::EXTRACTION_PROMPT)];
        messages.extend_from_slice(conversation);

        let request = CompletionRequest::new(&self.model.model, messages)
            .with_temperature(self.model.temperature)
            .forcing_function(Self::extraction_function());

        let response = self.client.complete(request).await?;
        let extracted: ExtractedIdentifier = match response.function_arguments() {
            Ok(extracted) => extracted,
            Err(e) => {
                // A malformed extraction reply is treated as a miss.
                tracing::warn!(error = %e, "identifier extraction returned no usable call");
                return Ok(None);
            }
        };

        Ok(classify_identifier(&extracted.identifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tool_call_response, ScriptedClient};

    #[test]
    fn numeric_ids_classify_as_customer_id() {
        assert_eq!(classify_identifier("1"), Some(Identifier::CustomerId(1)));
        assert_eq!(classify_identifier(" 42 "), Some(Identifier::CustomerId(42)));
    }

    #[test]
    fn emails_classify_as_email() {
        assert_eq!(
            classify_identifier("luisg@embraer.com.br"),
            Some(Identifier::Email("luisg@embraer.com.br".to_string()))
        );
    }

    #[test]
    fn phones_keep_their_formatting() {
        assert_eq!(
            classify_identifier("+55 (12) 3923-5555"),
            Some(Identifier::Phone("+55 (12) 3923-5555".to_string()))
        );
    }

    #[test]
    fn free_text_is_not_an_identifier() {
        assert_eq!(classify_identifier(""), None);
        assert_eq!(classify_identifier("my dog's name"), None);
        assert_eq!(classify_identifier("rock music"), None);
    }

    #[tokio::test]
    async fn extraction_miss_returns_none() {
        let client = ScriptedClient::new(vec![tool_call_response(
            "record_identifier",
            serde_json::json!({ "identifier": "" }),
        )]);

        let extractor = IdentifierExtractor::new(
            Arc::new(client),
            ModelConfig::new("openai/gpt-4o-mini"),
        );
        let result = extractor
            .extract(&[Message::user("hello there")])
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn extraction_hit_is_classified() {
        let client = ScriptedClient::new(vec![tool_call_response(
            "record_identifier",
            serde_json::json!({ "identifier": "1" }),
        )]);

        let extractor = IdentifierExtractor::new(
            Arc::new(client),
            ModelConfig::new("openai/gpt-4o-mini"),
        );
        let result = extractor
            .extract(&[Message::user("My customer ID is 1.")])
            .await
            .unwrap();
        assert_eq!(result, Some(Identifier::CustomerId(1)));
    }
}
