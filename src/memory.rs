//! Per-customer preference memory
//!
//! Preference profiles are keyed by verified customer identity and live
//! for the process lifetime: created on first explicit preference
//! statement, merged on later ones, never evicted. Persistence beyond the
//! process is a non-goal.

use crate::config::ModelConfig;
use crate::error::Result;
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message, Role, ToolDefinition};
use crate::prompts;
use crate::types::CustomerId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of recent messages the judgment call considers
const JUDGMENT_WINDOW: usize = 10;

/// A customer's stored music preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceProfile {
    /// Owning customer
    pub customer: CustomerId,
    /// Explicitly stated preferences (artists, genres, free text)
    pub music_preferences: Vec<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl PreferenceProfile {
    /// Create an empty profile
    pub fn new(customer: CustomerId) -> Self {
        let now = Utc::now();
        Self {
            customer,
            music_preferences: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge new preferences in, deduplicating case-insensitively.
    /// Existing entries are kept; merge never shrinks the list.
    pub fn merge(&mut self, incoming: &[String]) {
        for pref in incoming {
            let pref = pref.trim();
            if pref.is_empty() {
                continue;
            }
            let known = self
                .music_preferences
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(pref));
            if !known {
                self.music_preferences.push(pref.to_string());
            }
        }
        self.updated_at = Utc::now();
    }

    /// Render the profile as conversational context for the agents
    pub fn format(&self) -> String {
        if self.music_preferences.is_empty() {
            String::new()
        } else {
            format!("Music Preferences: {}", self.music_preferences.join(", "))
        }
    }
}

/// In-process preference store, keyed by customer identity.
///
/// Different identities never contend; concurrent sessions for the same
/// identity would race on read-modify-write, an accepted limitation.
#[derive(Default)]
pub struct PreferenceStore {
    profiles: DashMap<CustomerId, PreferenceProfile>,
}

impl PreferenceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a customer's profile, if one exists
    pub fn load(&self, customer: CustomerId) -> Option<PreferenceProfile> {
        self.profiles.get(&customer).map(|p| p.clone())
    }

    /// Formatted profile for conversational context; empty when absent
    pub fn loaded_context(&self, customer: CustomerId) -> String {
        self.load(customer).map(|p| p.format()).unwrap_or_default()
    }

    /// Merge preferences into the customer's profile, creating it on
    /// first write
    pub fn merge(&self, customer: CustomerId, incoming: &[String]) {
        let mut entry = self
            .profiles
            .entry(customer)
            .or_insert_with(|| PreferenceProfile::new(customer));
        entry.merge(incoming);
    }
}

#[derive(Debug, Deserialize)]
struct PreferenceJudgment {
    #[serde(default)]
    preference_stated: bool,
    #[serde(default)]
    music_preferences: Vec<String>,
}

/// Runs the post-turn preference judgment and writes back on an explicit
/// statement.
///
/// False negatives are safe (no write); the prompt is tuned to keep
/// false positives down. A failed judgment call logs and skips the write.
pub struct MemoryWriter {
    client: Arc<dyn LlmClient>,
    model: ModelConfig,
}

impl MemoryWriter {
    /// Create a new writer
    pub fn new(client: Arc<dyn LlmClient>, model: ModelConfig) -> Self {
        Self { client, model }
    }

    fn judgment_function() -> ToolDefinition {
        ToolDefinition::function(
            "update_profile",
            "Report whether the customer explicitly stated a music preference, \
             and the merged preference list if so",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "preference_stated": {
                        "type": "boolean",
                        "description": "True only when the customer explicitly stated \
                                        a music preference this turn"
                    },
                    "music_preferences": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "The merged preference list (existing plus new)"
                    }
                },
                "required": ["preference_stated", "music_preferences"]
            }),
        )
    }

    /// Judge the latest exchange and update the store when an explicit
    /// preference was stated. Returns whether a write happened.
    pub async fn observe(
        &self,
        store: &PreferenceStore,
        customer: CustomerId,
        conversation: &[Message],
    ) -> Result<bool> {
        let window = conversation
            .iter()
            .rev()
            .take(JUDGMENT_WINDOW)
            .collect::<Vec<_>>()
            .into_iter()
            .rev();
        let transcript = window
            .filter(|m| !m.content.is_empty())
            .map(|m| {
                let role = match m.role {
                    Role::User => "customer",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                    Role::Tool => "tool",
                };
                format!("{}: {}", role, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n");

        let existing = store.loaded_context(customer);
        let prompt = prompts::memory_judgment_prompt(&transcript, &existing);

        let request = CompletionRequest::new(&self.model.model, vec![Message::system(prompt)])
            .with_temperature(self.model.temperature)
            .forcing_function(Self::judgment_function());

        let judgment: PreferenceJudgment = match self.client.complete(request).await {
            Ok(response) => match response.function_arguments() {
                Ok(judgment) => judgment,
                Err(e) => {
                    tracing::warn!(error = %e, "preference judgment unparseable, skipping write");
                    return Ok(false);
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "preference judgment call failed, skipping write");
                return Ok(false);
            }
        };

        if !judgment.preference_stated || judgment.music_preferences.is_empty() {
            return Ok(false);
        }

        store.merge(customer, &judgment.music_preferences);
        tracing::info!(
            customer = %customer,
            preferences = ?judgment.music_preferences,
            "preference profile updated"
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tool_call_response, ScriptedClient};

    #[test]
    fn merge_creates_profile_on_first_write() {
        let store = PreferenceStore::new();
        let customer = CustomerId::new(1);
        assert!(store.load(customer).is_none());

        store.merge(customer, &["rock".to_string()]);
        let profile = store.load(customer).unwrap();
        assert_eq!(profile.music_preferences, vec!["rock"]);
    }

    #[test]
    fn merge_deduplicates_case_insensitively() {
        let store = PreferenceStore::new();
        let customer = CustomerId::new(1);

        store.merge(customer, &["Rock".to_string(), "jazz".to_string()]);
        store.merge(customer, &["rock".to_string(), "U2".to_string()]);

        let profile = store.load(customer).unwrap();
        assert_eq!(profile.music_preferences, vec!["Rock", "jazz", "U2"]);
    }

    #[test]
    fn profiles_are_scoped_per_customer() {
        let store = PreferenceStore::new();
        store.merge(CustomerId::new(1), &["rock".to_string()]);

        assert!(store.load(CustomerId::new(2)).is_none());
        assert_eq!(store.loaded_context(CustomerId::new(2)), "");
    }

    #[tokio::test]
    async fn explicit_statement_writes_profile() {
        let store = PreferenceStore::new();
        let client = ScriptedClient::new(vec![tool_call_response(
            "update_profile",
            serde_json::json!({
                "preference_stated": true,
                "music_preferences": ["rock"]
            }),
        )]);

        let writer = MemoryWriter::new(Arc::new(client), ModelConfig::new("openai/gpt-4o-mini"));
        let wrote = writer
            .observe(
                &store,
                CustomerId::new(1),
                &[Message::user("I love rock music!")],
            )
            .await
            .unwrap();

        assert!(wrote);
        let profile = store.load(CustomerId::new(1)).unwrap();
        assert!(profile
            .music_preferences
            .iter()
            .any(|p| p.eq_ignore_ascii_case("rock")));
    }

    #[tokio::test]
    async fn question_does_not_write_profile() {
        let store = PreferenceStore::new();
        let client = ScriptedClient::new(vec![tool_call_response(
            "update_profile",
            serde_json::json!({
                "preference_stated": false,
                "music_preferences": []
            }),
        )]);

        let writer = MemoryWriter::new(Arc::new(client), ModelConfig::new("openai/gpt-4o-mini"));
        let wrote = writer
            .observe(
                &store,
                CustomerId::new(1),
                &[Message::user("do you have rock music?")],
            )
            .await
            .unwrap();

        assert!(!wrote);
        assert!(store.load(CustomerId::new(1)).is_none());
    }

    #[tokio::test]
    async fn failed_judgment_skips_write_without_error() {
        let store = PreferenceStore::new();
        // Scripted client with an empty queue errors on the call.
        let client = ScriptedClient::new(vec![]);

        let writer = MemoryWriter::new(Arc::new(client), ModelConfig::new("openai/gpt-4o-mini"));
        let wrote = writer
            .observe(&store, CustomerId::new(1), &[Message::user("hi")])
            .await
            .unwrap();

        assert!(!wrote);
    }
}
