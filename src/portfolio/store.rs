// =============================================================================
// Portfolio Store — persistence seam for users / portfolios / holdings
// =============================================================================
//
// Durable persistence is a hosted relational database owned by an external
// collaborator; the gateway only depends on this trait. `MemoryStore` is the
// in-process implementation used by the server default and by tests.
//
// Every user gets a single "Default" portfolio created on first touch, and
// holdings are upserted by (portfolio, crypto id) — the same shape the
// dashboard's holdings API has always exposed.
// =============================================================================

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub crypto_id: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: DonationStatus,
    pub message: Option<String>,
    pub checkout_session_id: String,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for a donation record.
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub message: Option<String>,
    pub checkout_session_id: String,
}

// =============================================================================
// Trait
// =============================================================================

pub trait PortfolioStore: Send + Sync {
    fn get_or_create_user(&self, email: &str) -> User;
    fn get_or_create_default_portfolio(&self, user_id: Uuid) -> Portfolio;

    fn list_holdings(&self, portfolio_id: Uuid) -> Vec<Holding>;
    /// Insert or replace the holding for (portfolio, crypto id).
    fn upsert_holding(&self, portfolio_id: Uuid, crypto_id: &str, amount: f64) -> Holding;
    /// Update an existing holding; `None` when absent.
    fn update_holding(&self, portfolio_id: Uuid, crypto_id: &str, amount: f64)
        -> Option<Holding>;
    /// Remove a holding; returns whether anything was deleted.
    fn delete_holding(&self, portfolio_id: Uuid, crypto_id: &str) -> bool;

    /// Record a donation. Callers treat failures as best-effort (logged and
    /// swallowed), so the primary response path never depends on this.
    fn record_donation(&self, donation: NewDonation) -> Result<Donation>;
    /// Update a donation's status by checkout session id.
    fn set_donation_status(&self, session_id: &str, status: DonationStatus) -> Option<Donation>;
    fn find_donation(&self, session_id: &str) -> Option<Donation>;
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    portfolios: RwLock<HashMap<Uuid, Portfolio>>,
    holdings: RwLock<HashMap<Uuid, Vec<Holding>>>,
    donations: RwLock<Vec<Donation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PortfolioStore for MemoryStore {
    fn get_or_create_user(&self, email: &str) -> User {
        let mut users = self.users.write();
        users
            .entry(email.to_string())
            .or_insert_with(|| User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                created_at: Utc::now(),
            })
            .clone()
    }

    fn get_or_create_default_portfolio(&self, user_id: Uuid) -> Portfolio {
        let mut portfolios = self.portfolios.write();
        portfolios
            .entry(user_id)
            .or_insert_with(|| Portfolio {
                id: Uuid::new_v4(),
                user_id,
                name: "Default".to_string(),
                description: Some("Default portfolio".to_string()),
                created_at: Utc::now(),
            })
            .clone()
    }

    fn list_holdings(&self, portfolio_id: Uuid) -> Vec<Holding> {
        self.holdings
            .read()
            .get(&portfolio_id)
            .cloned()
            .unwrap_or_default()
    }

    fn upsert_holding(&self, portfolio_id: Uuid, crypto_id: &str, amount: f64) -> Holding {
        let mut map = self.holdings.write();
        let rows = map.entry(portfolio_id).or_default();
        if let Some(existing) = rows.iter_mut().find(|h| h.crypto_id == crypto_id) {
            existing.amount = amount;
            existing.updated_at = Utc::now();
            return existing.clone();
        }
        let now = Utc::now();
        let holding = Holding {
            id: Uuid::new_v4(),
            portfolio_id,
            crypto_id: crypto_id.to_string(),
            amount,
            created_at: now,
            updated_at: now,
        };
        rows.push(holding.clone());
        holding
    }

    fn update_holding(
        &self,
        portfolio_id: Uuid,
        crypto_id: &str,
        amount: f64,
    ) -> Option<Holding> {
        let mut map = self.holdings.write();
        let rows = map.get_mut(&portfolio_id)?;
        let existing = rows.iter_mut().find(|h| h.crypto_id == crypto_id)?;
        existing.amount = amount;
        existing.updated_at = Utc::now();
        Some(existing.clone())
    }

    fn delete_holding(&self, portfolio_id: Uuid, crypto_id: &str) -> bool {
        let mut map = self.holdings.write();
        let Some(rows) = map.get_mut(&portfolio_id) else {
            return false;
        };
        let before = rows.len();
        rows.retain(|h| h.crypto_id != crypto_id);
        rows.len() != before
    }

    fn record_donation(&self, donation: NewDonation) -> Result<Donation> {
        let record = Donation {
            id: Uuid::new_v4(),
            user_id: donation.user_id,
            email: donation.email,
            amount: donation.amount,
            currency: donation.currency,
            status: DonationStatus::Pending,
            message: donation.message,
            checkout_session_id: donation.checkout_session_id,
            created_at: Utc::now(),
        };
        self.donations.write().push(record.clone());
        Ok(record)
    }

    fn set_donation_status(&self, session_id: &str, status: DonationStatus) -> Option<Donation> {
        let mut donations = self.donations.write();
        let record = donations
            .iter_mut()
            .find(|d| d.checkout_session_id == session_id)?;
        record.status = status;
        Some(record.clone())
    }

    fn find_donation(&self, session_id: &str) -> Option<Donation> {
        self.donations
            .read()
            .iter()
            .find(|d| d.checkout_session_id == session_id)
            .cloned()
    }
}

// =============================================================================
// Tests
// =============================================================================
