//! Dataset loader and read-only relational store
//!
//! The store wraps the Chinook sample database (customers, invoices,
//! tracks, albums, artists, genres). It is loaded once at startup and is
//! read-only afterwards, so it can be shared across sessions without
//! locking. Every lookup uses parameter binding; user-controlled values
//! are never interpolated into SQL text.

use crate::config::{CatalogConfig, CatalogSource};
use crate::error::{Error, Result};
use crate::types::CustomerId;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// Row cap for track lookups
pub const TRACKS_CAP: u32 = 20;
/// Row cap for album lookups
pub const ALBUMS_CAP: u32 = 20;
/// Row cap for song-title matches
pub const TITLE_MATCH_CAP: u32 = 10;
/// Sample size for genre lookups (one track per artist)
pub const GENRE_SAMPLE_CAP: u32 = 8;

/// Customer reference record
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    /// Dataset primary key
    pub id: CustomerId,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Email address
    pub email: String,
    /// Phone number, when on file
    pub phone: Option<String>,
}

/// Album lookup row
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumRow {
    /// Album title
    pub title: String,
    /// Artist name
    pub artist: String,
}

/// Track lookup row
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRow {
    /// Track name
    pub track: String,
    /// Artist name, when the album has one
    pub artist: Option<String>,
}

/// Song-title match row
#[derive(Debug, Clone, PartialEq)]
pub struct SongMatch {
    /// Track name
    pub track: String,
    /// Artist name
    pub artist: Option<String>,
    /// Album title
    pub album: Option<String>,
}

/// Invoice row, scoped to one customer
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceRow {
    /// Invoice primary key
    pub invoice_id: i64,
    /// Invoice date as stored in the dataset
    pub date: String,
    /// Billing country
    pub billing_country: Option<String>,
    /// Invoice total
    pub total: f64,
    /// Line-item unit price, present on price-sorted lookups
    pub unit_price: Option<f64>,
}

/// Support representative associated with an invoice
#[derive(Debug, Clone, PartialEq)]
pub struct SupportRep {
    /// First name
    pub first_name: String,
    /// Job title
    pub title: Option<String>,
    /// Email address
    pub email: Option<String>,
}

/// Read-only store over the music-store dataset
#[derive(Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    /// Load the dataset from the configured source and verify it.
    ///
    /// Any failure here is fatal: the assistant must not start against a
    /// half-initialized dataset.
    pub async fn load(config: &CatalogConfig) -> Result<Self> {
        let store = match &config.source {
            CatalogSource::SqliteFile(path) => Self::open_file(path).await?,
            CatalogSource::SqlScript(path) => {
                let script = tokio::fs::read_to_string(path).await?;
                Self::from_script(&script).await?
            }
            CatalogSource::DownloadSql(url) => {
                tracing::info!(%url, "downloading dataset SQL dump");
                let script = reqwest::get(url.clone()).await?.text().await?;
                Self::from_script(&script).await?
            }
        };

        store.verify().await?;
        Ok(store)
    }

    /// Open an existing SQLite database file read-only
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .read_only(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| Error::dataset_unavailable(format!("failed to open dataset: {}", e)))?;
        Ok(Self { pool })
    }

    /// Build an in-memory store from a SQL dump.
    ///
    /// The pool is pinned to a single connection so every query sees the
    /// same `:memory:` database.
    pub async fn from_script(script: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::dataset_unavailable(format!("failed to create store: {}", e)))?;

        sqlx::raw_sql(script)
            .execute(&pool)
            .await
            .map_err(|e| Error::dataset_unavailable(format!("failed to load dataset: {}", e)))?;

        Ok(Self { pool })
    }

    /// Verify the dataset is loaded and populated
    pub async fn verify(&self) -> Result<()> {
        let row = sqlx::query("SELECT COUNT(*) FROM Customer")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::dataset_unavailable(format!("verification query failed: {}", e)))?;
        let count: i64 = row.get(0);

        if count == 0 {
            return Err(Error::dataset_unavailable("Customer table is empty"));
        }

        tracing::info!(customers = count, "dataset verified");
        Ok(())
    }

    fn row_to_customer(row: sqlx::sqlite::SqliteRow) -> CustomerRecord {
        CustomerRecord {
            id: CustomerId::new(row.get(0)),
            first_name: row.get(1),
            last_name: row.get(2),
            email: row.get(3),
            phone: row.get(4),
        }
    }

    /// Look up a customer by primary key
    pub async fn customer_by_id(&self, id: i64) -> Result<Option<CustomerRecord>> {
        let row = sqlx::query(
            "SELECT CustomerId, FirstName, LastName, Email, Phone \
             FROM Customer WHERE CustomerId = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::row_to_customer))
    }

    /// Look up a customer by email (case-insensitive).
    ///
    /// Returns a match only when exactly one customer has this email;
    /// an ambiguous identifier must never bind an arbitrary account.
    pub async fn customer_by_email(&self, email: &str) -> Result<Option<CustomerRecord>> {
        let rows = sqlx::query(
            "SELECT CustomerId, FirstName, LastName, Email, Phone \
             FROM Customer WHERE Email = ? COLLATE NOCASE LIMIT 2",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        Ok(Self::unique_customer(rows))
    }

    /// Look up a customer by phone number, exactly as stored.
    ///
    /// Same uniqueness rule as [`customer_by_email`](Self::customer_by_email).
    pub async fn customer_by_phone(&self, phone: &str) -> Result<Option<CustomerRecord>> {
        let rows = sqlx::query(
            "SELECT CustomerId, FirstName, LastName, Email, Phone \
             FROM Customer WHERE Phone = ? LIMIT 2",
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await?;

        Ok(Self::unique_customer(rows))
    }

    fn unique_customer(rows: Vec<sqlx::sqlite::SqliteRow>) -> Option<CustomerRecord> {
        match rows.len() {
            1 => rows.into_iter().next().map(Self::row_to_customer),
            0 => None,
            _ => {
                tracing::warn!("identifier matches more than one customer, not binding");
                None
            }
        }
    }

    /// Albums whose artist name contains `artist`
    pub async fn albums_by_artist(&self, artist: &str) -> Result<Vec<AlbumRow>> {
        let rows = sqlx::query(
            "SELECT Album.Title, Artist.Name \
             FROM Album \
             JOIN Artist ON Album.ArtistId = Artist.ArtistId \
             WHERE Artist.Name LIKE ? \
             ORDER BY Album.Title \
             LIMIT ?",
        )
        .bind(like_pattern(artist))
        .bind(ALBUMS_CAP)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AlbumRow {
                title: row.get(0),
                artist: row.get(1),
            })
            .collect())
    }

    /// Tracks whose artist name contains `artist`, capped at [`TRACKS_CAP`]
    pub async fn tracks_by_artist(&self, artist: &str) -> Result<Vec<TrackRow>> {
        let rows = sqlx::query(
            "SELECT Track.Name, Artist.Name \
             FROM Album \
             LEFT JOIN Artist ON Album.ArtistId = Artist.ArtistId \
             LEFT JOIN Track ON Track.AlbumId = Album.AlbumId \
             WHERE Artist.Name LIKE ? AND Track.Name IS NOT NULL \
             LIMIT ?",
        )
        .bind(like_pattern(artist))
        .bind(TRACKS_CAP)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TrackRow {
                track: row.get(0),
                artist: row.get(1),
            })
            .collect())
    }

    /// Sample of tracks in genres whose name contains `genre`.
    ///
    /// Resolves matching genre ids first, then returns one track per
    /// artist, capped at [`GENRE_SAMPLE_CAP`]. Re-running the same lookup
    /// returns an identical result set.
    pub async fn tracks_by_genre(&self, genre: &str) -> Result<Vec<TrackRow>> {
        let genre_rows = sqlx::query("SELECT GenreId FROM Genre WHERE Name LIKE ?")
            .bind(like_pattern(genre))
            .fetch_all(&self.pool)
            .await?;

        let genre_ids: Vec<i64> = genre_rows.into_iter().map(|row| row.get(0)).collect();
        if genre_ids.is_empty() {
            return Ok(Vec::new());
        }

        // One bound placeholder per genre id.
        let placeholders = vec!["?"; genre_ids.len()].join(", ");
        let sql = format!(
            "SELECT Track.Name, Artist.Name \
             FROM Track \
             LEFT JOIN Album ON Track.AlbumId = Album.AlbumId \
             LEFT JOIN Artist ON Album.ArtistId = Artist.ArtistId \
             WHERE Track.GenreId IN ({}) \
             GROUP BY Artist.Name \
             ORDER BY Artist.Name \
             LIMIT ?",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for id in genre_ids {
            query = query.bind(id);
        }
        let rows = query.bind(GENRE_SAMPLE_CAP).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|row| TrackRow {
                track: row.get(0),
                artist: row.get(1),
            })
            .collect())
    }

    /// Tracks whose name contains `title`, capped at [`TITLE_MATCH_CAP`]
    pub async fn songs_by_title(&self, title: &str) -> Result<Vec<SongMatch>> {
        let rows = sqlx::query(
            "SELECT Track.Name, Artist.Name, Album.Title \
             FROM Track \
             LEFT JOIN Album ON Track.AlbumId = Album.AlbumId \
             LEFT JOIN Artist ON Album.ArtistId = Artist.ArtistId \
             WHERE Track.Name LIKE ? \
             LIMIT ?",
        )
        .bind(like_pattern(title))
        .bind(TITLE_MATCH_CAP)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SongMatch {
                track: row.get(0),
                artist: row.get(1),
                album: row.get(2),
            })
            .collect())
    }

    /// All invoices for one customer, most recent first
    pub async fn invoices_by_date(&self, customer: CustomerId) -> Result<Vec<InvoiceRow>> {
        let rows = sqlx::query(
            "SELECT InvoiceId, InvoiceDate, BillingCountry, Total \
             FROM Invoice WHERE CustomerId = ? \
             ORDER BY InvoiceDate DESC, InvoiceId DESC",
        )
        .bind(customer.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvoiceRow {
                invoice_id: row.get(0),
                date: row.get(1),
                billing_country: row.get(2),
                total: row.get(3),
                unit_price: None,
            })
            .collect())
    }

    /// All invoices for one customer, highest line-item unit price first
    pub async fn invoices_by_unit_price(&self, customer: CustomerId) -> Result<Vec<InvoiceRow>> {
        let rows = sqlx::query(
            "SELECT Invoice.InvoiceId, Invoice.InvoiceDate, Invoice.BillingCountry, \
                    Invoice.Total, InvoiceLine.UnitPrice \
             FROM Invoice \
             JOIN InvoiceLine ON Invoice.InvoiceId = InvoiceLine.InvoiceId \
             WHERE Invoice.CustomerId = ? \
             ORDER BY InvoiceLine.UnitPrice DESC, Invoice.InvoiceId",
        )
        .bind(customer.as_i64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvoiceRow {
                invoice_id: row.get(0),
                date: row.get(1),
                billing_country: row.get(2),
                total: row.get(3),
                unit_price: row.get(4),
            })
            .collect())
    }

    /// Support representative behind one of the customer's invoices
    pub async fn support_rep_for_invoice(
        &self,
        invoice_id: i64,
        customer: CustomerId,
    ) -> Result<Option<SupportRep>> {
        let row = sqlx::query(
            "SELECT Employee.FirstName, Employee.Title, Employee.Email \
             FROM Employee \
             JOIN Customer ON Customer.SupportRepId = Employee.EmployeeId \
             JOIN Invoice ON Invoice.CustomerId = Customer.CustomerId \
             WHERE Invoice.InvoiceId = ? AND Invoice.CustomerId = ?",
        )
        .bind(invoice_id)
        .bind(customer.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| SupportRep {
            first_name: row.get(0),
            title: row.get(1),
            email: row.get(2),
        }))
    }
}

fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}
