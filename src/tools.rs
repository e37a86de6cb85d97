//! Tool trait and the catalog/invoice lookup tools

use crate::catalog::{CatalogStore, InvoiceRow};
use crate::error::{Error, Result};
use crate::openrouter::ToolDefinition;
use crate::types::CustomerId;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Context provided to tools during execution.
///
/// Invoice tools take the customer identity from here, never from
/// model-supplied arguments; an unbound context makes them fail cleanly.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Verified customer identity bound to the session, if any
    pub customer: Option<CustomerId>,
}

impl ToolContext {
    /// Context with no bound identity
    pub fn unbound() -> Self {
        Self { customer: None }
    }

    /// Context carrying a verified customer identity
    pub fn bound(customer: CustomerId) -> Self {
        Self {
            customer: Some(customer),
        }
    }

    fn require_customer(&self) -> Result<CustomerId> {
        self.customer.ok_or(Error::IdentityNotBound)
    }
}

/// Output from a tool execution
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Whether the tool execution was successful
    pub success: bool,
    /// Output content, fed back to the model as a tool result
    pub content: String,
}

impl ToolOutput {
    /// Create a successful tool output
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
        }
    }

    /// Create a failed tool output
    pub fn failure(content: impl Into<String>) -> Self {
        Self {
            success: false,
            content: content.into(),
        }
    }
}

/// JSON Schema for tool parameters
#[derive(Debug, Clone)]
pub struct JsonSchema {
    properties: HashMap<String, Value>,
    required: Vec<String>,
}

impl JsonSchema {
    /// Create an empty object schema
    pub fn empty() -> Self {
        Self {
            properties: HashMap::new(),
            required: Vec::new(),
        }
    }

    /// Add a required string property
    pub fn required_string(mut self, name: impl Into<String>, description: &str) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({ "type": "string", "description": description }),
        );
        self.required.push(name);
        self
    }

    /// Add a required integer property
    pub fn required_integer(mut self, name: impl Into<String>, description: &str) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({ "type": "integer", "description": description }),
        );
        self.required.push(name);
        self
    }

    /// Render as a JSON Schema value
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// Tool trait defining the interface for sub-agent capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier, used as the function name in tool calls
    fn id(&self) -> &str;

    /// Description for LLM function calling
    fn description(&self) -> &str;

    /// JSON Schema for input parameters
    fn input_schema(&self) -> JsonSchema;

    /// Execute the tool with given parameters
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput>;

    /// Wire-level function declaration for this tool
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::function(self.id(), self.description(), self.input_schema().to_value())
    }
}

fn string_param(params: &Value, name: &str) -> Result<String> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("missing '{}' parameter", name)))
}

fn integer_param(params: &Value, name: &str) -> Result<i64> {
    params
        .get(name)
        .and_then(|v| {
            // Models sometimes send numbers as strings.
            v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        })
        .ok_or_else(|| Error::InvalidInput(format!("missing '{}' parameter", name)))
}

fn format_invoices(invoices: &[InvoiceRow]) -> String {
    invoices
        .iter()
        .map(|i| {
            let price = i
                .unit_price
                .map(|p| format!(", unit price ${:.2}", p))
                .unwrap_or_default();
            format!(
                "Invoice {} on {} ({}): total ${:.2}{}",
                i.invoice_id,
                i.date,
                i.billing_country.as_deref().unwrap_or("unknown country"),
                i.total,
                price,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Music catalog tools ──

/// Albums by an artist
pub struct AlbumsByArtistTool {
    store: CatalogStore,
}

#[async_trait]
impl Tool for AlbumsByArtistTool {
    fn id(&self) -> &str {
        "albums_by_artist"
    }

    fn description(&self) -> &str {
        "Get albums by an artist from the music catalog"
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::empty().required_string("artist", "The artist name to search for")
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let artist = string_param(&params, "artist")?;
        let albums = self.store.albums_by_artist(&artist).await?;

        if albums.is_empty() {
            return Ok(ToolOutput::success(format!(
                "No albums found for artist: {}",
                artist
            )));
        }

        let listing = albums
            .iter()
            .map(|a| format!("{} - {}", a.title, a.artist))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ToolOutput::success(listing))
    }
}

/// Tracks by an artist
pub struct TracksByArtistTool {
    store: CatalogStore,
}

#[async_trait]
impl Tool for TracksByArtistTool {
    fn id(&self) -> &str {
        "tracks_by_artist"
    }

    fn description(&self) -> &str {
        "Get songs/tracks by an artist from the catalog"
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::empty().required_string("artist", "The artist name to search for")
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let artist = string_param(&params, "artist")?;
        let tracks = self.store.tracks_by_artist(&artist).await?;

        if tracks.is_empty() {
            return Ok(ToolOutput::success(format!(
                "No tracks found for artist: {}",
                artist
            )));
        }

        let listing = tracks
            .iter()
            .map(|t| format!("{} - {}", t.track, t.artist.as_deref().unwrap_or("unknown")))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ToolOutput::success(listing))
    }
}

/// Songs matching a genre
pub struct SongsByGenreTool {
    store: CatalogStore,
}

#[async_trait]
impl Tool for SongsByGenreTool {
    fn id(&self) -> &str {
        "songs_by_genre"
    }

    fn description(&self) -> &str {
        "Fetch a sample of songs that match a specific genre"
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::empty().required_string("genre", "The genre to search for")
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let genre = string_param(&params, "genre")?;
        let tracks = self.store.tracks_by_genre(&genre).await?;

        if tracks.is_empty() {
            return Ok(ToolOutput::success(format!(
                "No songs found for the genre: {}",
                genre
            )));
        }

        let listing = tracks
            .iter()
            .map(|t| format!("{} - {}", t.track, t.artist.as_deref().unwrap_or("unknown")))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ToolOutput::success(listing))
    }
}

/// Song-title existence check
pub struct CheckForSongsTool {
    store: CatalogStore,
}

#[async_trait]
impl Tool for CheckForSongsTool {
    fn id(&self) -> &str {
        "check_for_songs"
    }

    fn description(&self) -> &str {
        "Check whether a song exists in the catalog by its name"
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::empty().required_string("song_title", "The song title to look for")
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let title = string_param(&params, "song_title")?;
        let matches = self.store.songs_by_title(&title).await?;

        if matches.is_empty() {
            return Ok(ToolOutput::success(format!(
                "No songs found matching: {}",
                title
            )));
        }

        let listing = matches
            .iter()
            .map(|m| {
                format!(
                    "{} - {} (album: {})",
                    m.track,
                    m.artist.as_deref().unwrap_or("unknown"),
                    m.album.as_deref().unwrap_or("unknown"),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ToolOutput::success(listing))
    }
}

// ── Invoice tools ──
//
// These never accept a customer id from the model: the id comes from the
// session-bound ToolContext.

/// Invoices for the verified customer, most recent first
pub struct InvoicesByDateTool {
    store: CatalogStore,
}

#[async_trait]
impl Tool for InvoicesByDateTool {
    fn id(&self) -> &str {
        "invoices_by_date"
    }

    fn description(&self) -> &str {
        "All invoices for the verified customer, sorted most recent first"
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::empty()
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let customer = ctx.require_customer()?;
        let invoices = self.store.invoices_by_date(customer).await?;

        if invoices.is_empty() {
            return Ok(ToolOutput::success("No invoices found for this account."));
        }
        Ok(ToolOutput::success(format_invoices(&invoices)))
    }
}

/// Invoices for the verified customer, highest unit price first
pub struct InvoicesByUnitPriceTool {
    store: CatalogStore,
}

#[async_trait]
impl Tool for InvoicesByUnitPriceTool {
    fn id(&self) -> &str {
        "invoices_by_unit_price"
    }

    fn description(&self) -> &str {
        "The verified customer's invoices sorted by line-item unit price, highest first"
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::empty()
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let customer = ctx.require_customer()?;
        let invoices = self.store.invoices_by_unit_price(customer).await?;

        if invoices.is_empty() {
            return Ok(ToolOutput::success("No invoices found for this account."));
        }
        Ok(ToolOutput::success(format_invoices(&invoices)))
    }
}

/// Support representative behind one of the customer's invoices
pub struct SupportRepTool {
    store: CatalogStore,
}

#[async_trait]
impl Tool for SupportRepTool {
    fn id(&self) -> &str {
        "support_rep_for_invoice"
    }

    fn description(&self) -> &str {
        "Find the employee who handled one of the verified customer's invoices"
    }

    fn input_schema(&self) -> JsonSchema {
        JsonSchema::empty().required_integer("invoice_id", "The invoice to look up")
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let customer = ctx.require_customer()?;
        let invoice_id = integer_param(&params, "invoice_id")?;

        match self
            .store
            .support_rep_for_invoice(invoice_id, customer)
            .await?
        {
            Some(rep) => Ok(ToolOutput::success(format!(
                "{} ({}) - {}",
                rep.first_name,
                rep.title.as_deref().unwrap_or("Support"),
                rep.email.as_deref().unwrap_or("no email on file"),
            ))),
            None => Ok(ToolOutput::success(format!(
                "No employee found for invoice {} on this account.",
                invoice_id
            ))),
        }
    }
}

/// The music catalog tool set
pub fn music_tools(store: &CatalogStore) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(AlbumsByArtistTool {
            store: store.clone(),
        }),
        Arc::new(TracksByArtistTool {
            store: store.clone(),
        }),
        Arc::new(SongsByGenreTool {
            store: store.clone(),
        }),
        Arc::new(CheckForSongsTool {
            store: store.clone(),
        }),
    ]
}

/// The invoice tool set
pub fn invoice_tools(store: &CatalogStore) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(InvoicesByDateTool {
            store: store.clone(),
        }),
        Arc::new(InvoicesByUnitPriceTool {
            store: store.clone(),
        }),
        Arc::new(SupportRepTool {
            store: store.clone(),
        }),
    ]
}
