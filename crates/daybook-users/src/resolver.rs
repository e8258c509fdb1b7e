use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, warn};

use daybook_store::ServiceStore;

use crate::error::Result;
use crate::provider::IdentityProvider;

/// Resolves user ids to email addresses for the dispatch jobs.
///
/// No caching happens here: every batch run must observe fresh store state,
/// so each call re-reads profile rows and only then falls back to the
/// provider for the ids that had no cached address.
pub struct EmailResolver {
    store: Arc<ServiceStore>,
    provider: Box<dyn IdentityProvider>,
}

impl EmailResolver {
    pub fn new(store: Arc<ServiceStore>, provider: Box<dyn IdentityProvider>) -> Self {
        Self { store, provider }
    }

    /// Resolve every id in `user_ids` that has an address. Ids with neither
    /// a cached profile email nor a provider email are absent from the
    /// result; store or provider failures abort with an error.
    pub async fn emails_for(&self, user_ids: &BTreeSet<String>) -> Result<HashMap<String, String>> {
        let mut emails = self.store.profile_emails(user_ids)?;

        for user_id in user_ids {
            if emails.contains_key(user_id) {
                continue;
            }
            debug!(
                user_id = %user_id,
                provider = self.provider.name(),
                "no cached profile email; querying identity provider"
            );
            match self.provider.email_for(user_id).await? {
                Some(address) => {
                    emails.insert(user_id.clone(), address);
                }
                None => {
                    warn!(user_id = %user_id, "no email address resolvable");
                }
            }
        }

        Ok(emails)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UserError;
    use crate::provider::NoIdentityProvider;
    use async_trait::async_trait;
    use rusqlite::Connection;
    use std::sync::Mutex;

    struct StubProvider {
        emails: HashMap<String, String>,
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn email_for(&self, user_id: &str) -> Result<Option<String>> {
            Ok(self.emails.get(user_id).cloned())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl IdentityProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn email_for(&self, _user_id: &str) -> Result<Option<String>> {
            Err(UserError::Provider("lookup unavailable".to_string()))
        }
    }

    fn service_store() -> Arc<ServiceStore> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        daybook_store::db::init_db(&conn).unwrap();
        Arc::new(ServiceStore::new(Arc::new(Mutex::new(conn))))
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn cached_profile_email_wins_over_provider() {
        let store = service_store();
        store.upsert_profile_email("u1", "cached@x.com").unwrap();

        let provider = StubProvider {
            emails: HashMap::from([("u1".to_string(), "provider@x.com".to_string())]),
        };
        let resolver = EmailResolver::new(store, Box::new(provider));

        let emails = resolver.emails_for(&set(&["u1"])).await.unwrap();
        assert_eq!(emails.get("u1").map(String::as_str), Some("cached@x.com"));
    }

    #[tokio::test]
    async fn provider_fallback_fills_missing_addresses() {
        let store = service_store();
        store.create_profile_if_absent("u1").unwrap();

        let provider = StubProvider {
            emails: HashMap::from([("u1".to_string(), "fallback@x.com".to_string())]),
        };
        let resolver = EmailResolver::new(store, Box::new(provider));

        let emails = resolver.emails_for(&set(&["u1"])).await.unwrap();
        assert_eq!(emails.get("u1").map(String::as_str), Some("fallback@x.com"));
    }

    #[tokio::test]
    async fn unresolvable_ids_are_omitted_not_errors() {
        let store = service_store();
        let resolver = EmailResolver::new(store, Box::new(NoIdentityProvider));

        let emails = resolver.emails_for(&set(&["ghost"])).await.unwrap();
        assert!(emails.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_aborts_resolution() {
        let store = service_store();
        store.create_profile_if_absent("u1").unwrap();
        let resolver = EmailResolver::new(store, Box::new(FailingProvider));

        let err = resolver.emails_for(&set(&["u1"])).await.unwrap_err();
        assert!(matches!(err, UserError::Provider(_)));
    }
}
