//! Shared fixtures for unit tests

use crate::catalog::CatalogStore;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{
    Choice, CompletionRequest, CompletionResponse, FunctionCall, Message, Role, ToolCall, Usage,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Completion client that replays a fixed script of responses.
///
/// Each `complete` call pops the next scripted response and records the
/// request for later assertions. An exhausted script is an error, so a
/// test fails loudly when the code under test makes more calls than the
/// script expects.
pub struct ScriptedClient {
    script: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The nth request the client received
    pub fn request(&self, index: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    /// How many requests the client received
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::openrouter("scripted client ran out of responses"))
    }

    fn client_type(&self) -> &str {
        "scripted"
    }

    fn endpoint(&self) -> &str {
        "scripted://test"
    }
}

/// A plain-text assistant response
pub fn text_response(content: &str) -> CompletionResponse {
    CompletionResponse {
        id: "gen-test".to_string(),
        model: "test-model".to_string(),
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(content),
            finish_reason: Some("stop".to_string()),
        }],
        usage: Usage::default(),
    }
}

/// An assistant response calling a single function
pub fn tool_call_response(name: &str, arguments: serde_json::Value) -> CompletionResponse {
    CompletionResponse {
        id: "gen-test".to_string(),
        model: "test-model".to_string(),
        choices: vec![Choice {
            index: 0,
            message: Message {
                role: Role::Assistant,
                content: String::new(),
                tool_calls: Some(vec![ToolCall {
                    id: "call_test".to_string(),
                    tool_type: "function".to_string(),
                    function: FunctionCall {
                        name: name.to_string(),
                        arguments: arguments.to_string(),
                    },
                }]),
                tool_call_id: None,
            },
            finish_reason: Some("tool_calls".to_string()),
        }],
        usage: Usage::default(),
    }
}

const SEED_SQL: &str = r#"
CREATE TABLE Artist (ArtistId INTEGER PRIMARY KEY, Name TEXT);
CREATE TABLE Album (AlbumId INTEGER PRIMARY KEY, Title TEXT, ArtistId INTEGER);
CREATE TABLE Genre (GenreId INTEGER PRIMARY KEY, Name TEXT);
CREATE TABLE Track (
    TrackId INTEGER PRIMARY KEY,
    Name TEXT,
    AlbumId INTEGER,
    GenreId INTEGER
);
CREATE TABLE Employee (
    EmployeeId INTEGER PRIMARY KEY,
    FirstName TEXT,
    LastName TEXT,
    Title TEXT,
    Email TEXT
);
CREATE TABLE Customer (
    CustomerId INTEGER PRIMARY KEY,
    FirstName TEXT,
    LastName TEXT,
    Email TEXT,
    Phone TEXT,
    SupportRepId INTEGER
);
CREATE TABLE Invoice (
    InvoiceId INTEGER PRIMARY KEY,
    CustomerId INTEGER,
    InvoiceDate TEXT,
    BillingCountry TEXT,
    Total REAL
);
CREATE TABLE InvoiceLine (
    InvoiceLineId INTEGER PRIMARY KEY,
    InvoiceId INTEGER,
    TrackId INTEGER,
    UnitPrice REAL,
    Quantity INTEGER
);

INSERT INTO Artist (ArtistId, Name) VALUES
    (1, 'Rolling Stones'),
    (2, 'Miles Davis'),
    (3, 'The Ballad Company');

INSERT INTO Album (AlbumId, Title, ArtistId) VALUES
    (1, 'Hot Rocks', 1),
    (2, 'Sticky Fingers', 1),
    (3, 'Kind of Blue', 2),
    (4, 'Love Songs Collected', 3);

INSERT INTO Genre (GenreId, Name) VALUES
    (1, 'Rock'),
    (2, 'Jazz');

INSERT INTO Track (TrackId, Name, AlbumId, GenreId) VALUES
    (1, 'Gimme Shelter', 1, 1),
    (2, 'Brown Sugar', 2, 1),
    (3, 'Wild Horses', 2, 1),
    (4, 'So What', 3, 2),
    (5, 'Freddie Freeloader', 3, 2),
    (6, 'Blue in Green', 3, 2),
    (11, 'Love Song No. 1', 4, 1),
    (12, 'Love Song No. 2', 4, 1),
    (13, 'Love Song No. 3', 4, 1),
    (14, 'Love Song No. 4', 4, 1),
    (15, 'Love Song No. 5', 4, 1),
    (16, 'Love Song No. 6', 4, 1),
    (17, 'Love Song No. 7', 4, 1),
    (18, 'Love Song No. 8', 4, 1),
    (19, 'Love Song No. 9', 4, 1),
    (20, 'Love Song No. 10', 4, 1),
    (21, 'Love Song No. 11', 4, 1),
    (22, 'Love Song No. 12', 4, 1);

INSERT INTO Employee (EmployeeId, FirstName, LastName, Title, Email) VALUES
    (10, 'Jane', 'Peacock', 'Sales Support Agent', 'jane@tunedesk.example');

INSERT INTO Customer (CustomerId, FirstName, LastName, Email, Phone, SupportRepId) VALUES
    (1, 'Luis', 'Goncalves', 'luisg@embraer.com.br', '+55 (12) 3923-5555', 10),
    (3, 'Francois', 'Tremblay', 'ftremblay@gmail.com', '+1 (514) 721-4711', 10),
    (7, 'Astrid', 'Gruber', 'astrid.gruber@apple.at', '+1 555-0000', 10),
    (8, 'Daan', 'Peeters', 'daan_peeters@apple.be', '+1 555-0000', 10);

INSERT INTO Invoice (InvoiceId, CustomerId, InvoiceDate, BillingCountry, Total) VALUES
    (101, 1, '2025-01-15 00:00:00', 'Brazil', 8.91),
    (102, 1, '2025-03-02 00:00:00', 'Brazil', 1.98),
    (103, 1, '2025-06-20 00:00:00', 'Brazil', 13.86),
    (301, 3, '2025-02-10 00:00:00', 'Canada', 5.94);

INSERT INTO InvoiceLine (InvoiceLineId, InvoiceId, TrackId, UnitPrice, Quantity) VALUES
    (1, 101, 1, 0.99, 1),
    (2, 101, 4, 1.99, 1),
    (3, 102, 2, 0.99, 2),
    (4, 103, 3, 1.29, 1),
    (5, 301, 5, 0.99, 1);
"#;

/// A small in-memory catalog with the handful of rows the tests lean on
pub async fn seeded_store() -> CatalogStore {
    CatalogStore::from_script(SEED_SQL)
        .await
        .unwrap_or_else(|e| panic!("seeded store failed to load: {e}"))
}
