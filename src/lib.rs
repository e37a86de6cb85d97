//! # tunedesk
//!
//! Customer-support assistant for a digital music store, built as a
//! supervisor over two tool-calling sub-agents.
//!
//! ## Architecture
//!
//! - **Router**: classifies each turn into invoice, music, both, or
//!   neither with a forced function call
//! - **Identity gate**: account data requires a verified customer;
//!   unverified sessions suspend with a serializable phase and resume
//!   when an identifier checks out against the dataset
//! - **Sub-agents**: bounded tool loops over the catalog store, one for
//!   billing history and one for the music catalog
//! - **Preference memory**: explicit music preferences are merged into a
//!   per-customer profile and fed back into later prompts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tunedesk::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let store = CatalogStore::load(&CatalogConfig::from_env()).await?;
//!     let client = Arc::new(OpenRouterClient::from_env()?);
//!     let model = ModelConfig::new(presets::BALANCED);
//!
//!     let memory = Arc::new(PreferenceStore::new());
//!     let mut session = Session::new(client, model, store, memory)?;
//!
//!     let outcome = session
//!         .handle_turn("Do you have any albums by the Rolling Stones?")
//!         .await?;
//!     println!("{}", outcome.reply());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod catalog;
pub mod config;
pub mod error;
pub mod llm_client;
pub mod memory;
pub mod openrouter;
pub mod prompts;
pub mod router;
pub mod session;
pub mod tools;
pub mod types;
pub mod verify;

mod extract;

#[cfg(test)]
mod test_support;

pub use agent::{invoice_agent, music_agent, SubAgent, SubAgentBuilder};
pub use catalog::CatalogStore;
pub use config::{presets, CatalogConfig, CatalogSource, ModelConfig, OpenRouterConfig};
pub use error::{Error, Result};
pub use llm_client::LlmClient;
pub use memory::{MemoryWriter, PreferenceProfile, PreferenceStore};
pub use openrouter::OpenRouterClient;
pub use router::{AgentKind, RouteTarget, Router, TurnPlan, TurnState};
pub use session::{Session, SessionPhase, TurnOutcome, TurnStatus};
pub use tools::{Tool, ToolContext, ToolOutput};
pub use types::{CustomerId, SessionId, TokenUsage, TurnId};
pub use verify::{VerificationGate, VerifyOutcome};

/// Commonly used imports
pub mod prelude {
    pub use crate::agent::{invoice_agent, music_agent, SubAgent, SubAgentBuilder};
    pub use crate::catalog::CatalogStore;
    pub use crate::config::{presets, CatalogConfig, ModelConfig, OpenRouterConfig};
    pub use crate::error::{Error, Result};
    pub use crate::llm_client::LlmClient;
    pub use crate::memory::{PreferenceProfile, PreferenceStore};
    pub use crate::openrouter::OpenRouterClient;
    pub use crate::router::RouteTarget;
    pub use crate::session::{Session, SessionPhase, TurnOutcome, TurnStatus};
    pub use crate::tools::{Tool, ToolContext};
    pub use crate::types::CustomerId;
}
