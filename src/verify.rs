//! Identity verification gate
//!
//! Given free-text input and no bound identity: extract one candidate
//! identifier, classify it, and issue exactly one bound lookup against the
//! customer table. A single match binds the session identity; anything
//! else produces a polite re-ask and leaves the identity unbound.

use crate::catalog::{CatalogStore, CustomerRecord};
use crate::config::ModelConfig;
use crate::error::Result;
use crate::extract::{Identifier, IdentifierExtractor};
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message};
use crate::prompts;
use crate::types::CustomerId;
use std::sync::Arc;

/// Outcome of one pass through the verification gate
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// Identity verified and bound
    Verified {
        /// The verified customer
        customer: CustomerId,
        /// System-visible confirmation injected into the conversation so
        /// downstream agents treat the identity as ground truth
        confirmation: Message,
    },
    /// No usable identifier; the caller should suspend and re-ask
    Reprompt {
        /// Re-ask text to show the user
        reply: String,
    },
}

/// The verification gate
pub struct VerificationGate {
    store: CatalogStore,
    extractor: IdentifierExtractor,
    client: Arc<dyn LlmClient>,
    model: ModelConfig,
}

impl VerificationGate {
    /// Create a new gate
    pub fn new(store: CatalogStore, client: Arc<dyn LlmClient>, model: ModelConfig) -> Self {
        let extractor = IdentifierExtractor::new(client.clone(), model.clone());
        Self {
            store,
            extractor,
            client,
            model,
        }
    }

    /// Run the gate over the conversation so far
    pub async fn verify(&self, conversation: &[Message]) -> Result<VerifyOutcome> {
        let identifier = self.extractor.extract(conversation).await?;

        let record = match &identifier {
            // Extraction miss: re-ask without touching the dataset.
            None => None,
            Some(identifier) => self.lookup(identifier).await?,
        };

        match record {
            Some(record) => {
                tracing::info!(customer = %record.id, "customer identity verified");
                let confirmation = Message::system(format!(
                    "Customer verified successfully. The verified customer ID is {}. \
                     Use this account for all invoice and purchase lookups.",
                    record.id
                ));
                Ok(VerifyOutcome::Verified {
                    customer: record.id,
                    confirmation,
                })
            }
            None => {
                if identifier.is_some() {
                    tracing::info!("identifier not found in dataset, re-asking");
                }
                let reply = self.reprompt(conversation).await?;
                Ok(VerifyOutcome::Reprompt { reply })
            }
        }
    }

    /// Exactly one lookup, against the field matching the identifier shape
    async fn lookup(&self, identifier: &Identifier) -> Result<Option<CustomerRecord>> {
        match identifier {
            Identifier::CustomerId(id) => self.store.customer_by_id(*id).await,
            Identifier::Email(email) => self.store.customer_by_email(email).await,
            Identifier::Phone(phone) => self.store.customer_by_phone(phone).await,
        }
    }

    /// Generate the polite re-ask shown to the user
    async fn reprompt(&self, conversation: &[Message]) -> Result<String> {
        let mut messages = vec![Message::system(prompts::VERIFICATION_PROMPT)];
        messages.extend_from_slice(conversation);

        let request = CompletionRequest::new(&self.model.model, messages)
            .with_temperature(self.model.temperature);
        let response = self.client.complete(request).await?;

        Ok(response
            .content()
            .unwrap_or(
                "To help with your account, could you share your customer ID, \
                 email, or phone number?",
            )
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        seeded_store, text_response, tool_call_response, ScriptedClient,
    };

    fn gate_with(client: ScriptedClient, store: CatalogStore) -> VerificationGate {
        VerificationGate::new(
            store,
            Arc::new(client),
            ModelConfig::new("openai/gpt-4o-mini"),
        )
    }

    #[tokio::test]
    async fn valid_numeric_id_binds_exactly_that_customer() {
        let store = seeded_store().await;
        let client = ScriptedClient::new(vec![tool_call_response(
            "record_identifier",
            serde_json::json!({ "identifier": "1" }),
        )]);

        let outcome = gate_with(client, store)
            .verify(&[Message::user("My customer ID is 1.")])
            .await
            .unwrap();

        match outcome {
            VerifyOutcome::Verified {
                customer,
                confirmation,
            } => {
                assert_eq!(customer, CustomerId::new(1));
                assert!(confirmation.content.contains("customer ID is 1"));
            }
            other => panic!("expected Verified, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_email_reprompts_and_leaves_identity_unbound() {
        let store = seeded_store().await;
        let client = ScriptedClient::new(vec![
            tool_call_response(
                "record_identifier",
                serde_json::json!({ "identifier": "stranger@example.com" }),
            ),
            text_response("I couldn't find that email. Could you double-check it?"),
        ]);

        let outcome = gate_with(client, store)
            .verify(&[Message::user("my email is stranger@example.com")])
            .await
            .unwrap();

        assert!(matches!(outcome, VerifyOutcome::Reprompt { .. }));
    }

    #[tokio::test]
    async fn ambiguous_text_reprompts_without_a_lookup() {
        // An empty store would make any lookup fail loudly; the gate must
        // not get that far on an extraction miss.
        let store = CatalogStore::from_script(
            "CREATE TABLE Customer (CustomerId INTEGER PRIMARY KEY, FirstName TEXT, \
             LastName TEXT, Email TEXT, Phone TEXT, SupportRepId INTEGER);",
        )
        .await
        .unwrap();

        let client = ScriptedClient::new(vec![
            tool_call_response("record_identifier", serde_json::json!({ "identifier": "" })),
            text_response("Could you share your customer ID, email, or phone number?"),
        ]);

        let outcome = gate_with(client, store)
            .verify(&[Message::user("I like long walks on the beach")])
            .await
            .unwrap();

        match outcome {
            VerifyOutcome::Reprompt { reply } => {
                assert!(reply.to_lowercase().contains("customer id"));
            }
            other => panic!("expected Reprompt, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn phone_lookup_uses_stored_formatting() {
        let store = seeded_store().await;
        let client = ScriptedClient::new(vec![tool_call_response(
            "record_identifier",
            serde_json::json!({ "identifier": "+55 (12) 3923-5555" }),
        )]);

        let outcome = gate_with(client, store)
            .verify(&[Message::user("My phone number is +55 (12) 3923-5555.")])
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            VerifyOutcome::Verified { customer, .. } if customer == CustomerId::new(1)
        ));
    }

    #[tokio::test]
    async fn phone_shared_by_two_customers_reprompts_without_binding() {
        let store = seeded_store().await;
        let client = ScriptedClient::new(vec![
            tool_call_response(
                "record_identifier",
                serde_json::json!({ "identifier": "+1 555-0000" }),
            ),
            text_response("That number matches more than one account. Could you share \
                           your customer ID or email instead?"),
        ]);

        let outcome = gate_with(client, store)
            .verify(&[Message::user("my phone is +1 555-0000")])
            .await
            .unwrap();

        assert!(matches!(outcome, VerifyOutcome::Reprompt { .. }));
    }
}
