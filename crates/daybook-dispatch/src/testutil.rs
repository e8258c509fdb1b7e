//! Shared fixtures for the dispatch job tests: an in-memory store pair, a
//! recording mailer, and stub identity providers behind the trait seams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use rusqlite::Connection;

use daybook_core::clock::reference_zone;
use daybook_mailer::{MailError, Mailer, OutboundEmail};
use daybook_store::{db, ServiceStore, Store};
use daybook_users::{EmailResolver, IdentityProvider, NoIdentityProvider, UserError};

pub struct Harness {
    pub store: Store,
    pub service: Arc<ServiceStore>,
}

pub fn harness() -> Harness {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
    db::init_db(&conn).unwrap();
    let conn = Arc::new(Mutex::new(conn));
    Harness {
        store: Store::new(Arc::clone(&conn)),
        service: Arc::new(ServiceStore::new(conn)),
    }
}

impl Harness {
    pub fn user_with_email(&self, user_id: &str, email: &str) {
        self.service.upsert_profile_email(user_id, email).unwrap();
    }

    pub fn user_without_email(&self, user_id: &str) {
        self.service.create_profile_if_absent(user_id).unwrap();
    }

    /// Resolver backed by this harness's store and the given provider.
    pub fn resolver_with(&self, provider: impl IdentityProvider + 'static) -> EmailResolver {
        EmailResolver::new(Arc::clone(&self.service), Box::new(provider))
    }

    /// Resolver with no identity provider — the profile cache is everything.
    pub fn resolver(&self) -> EmailResolver {
        self.resolver_with(NoIdentityProvider)
    }
}

/// Reference-zone instant for driving the jobs in tests.
pub fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    reference_zone()
        .with_ymd_and_hms(2026, 3, 14, hour, minute, 0)
        .unwrap()
}

pub const TEST_DAY: &str = "2026-03-14";

/// Records every accepted email; optionally fails for one recipient address
/// to exercise the catch-log-continue path.
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
    fail_for: Option<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: None,
        }
    }

    pub fn failing_for(address: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: Some(address.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn sender(&self) -> &str {
        "Daybook <reminders@daybook.test>"
    }

    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        if email.to.iter().any(|to| Some(to) == self.fail_for.as_ref()) {
            return Err(MailError::Api {
                status: 500,
                body: "simulated delivery failure".to_string(),
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Identity provider backed by a fixed map.
pub struct StubProvider {
    emails: HashMap<String, String>,
}

impl StubProvider {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        Self {
            emails: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn email_for(&self, user_id: &str) -> Result<Option<String>, UserError> {
        Ok(self.emails.get(user_id).cloned())
    }
}

/// Identity provider whose every lookup fails — aborts resolution.
pub struct FailingProvider;

#[async_trait]
impl IdentityProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn email_for(&self, _user_id: &str) -> Result<Option<String>, UserError> {
        Err(UserError::Provider("lookup unavailable".to_string()))
    }
}
