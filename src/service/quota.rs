use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::Store;

/// Gates node creation on the owner's plan.
pub struct QuotaGuard {
    store: Arc<dyn Store>,
}

impl QuotaGuard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Fails with `Error::QuotaExceeded` once a free user owns `memory_limit`
    /// nodes. Premium users always pass.
    ///
    /// When the user record cannot be loaded the check passes: a lookup
    /// failure must not block creation. Counting failures still propagate.
    pub fn check_can_create_node(&self, user_id: &str) -> Result<()> {
        let user = match self.store.get_user(user_id) {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(user_id, "Quota check skipped, user not found");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Quota check skipped, user lookup failed");
                return Ok(());
            }
        };

        if user.is_premium {
            return Ok(());
        }

        let count = self.store.count_nodes(user_id)?;
        if count >= user.memory_limit {
            tracing::info!(user_id, count, limit = user.memory_limit, "Memory limit reached");
            return Err(Error::QuotaExceeded {
                limit: user.memory_limit,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{insert_user, sqlite_store};
    use crate::types::{DEFAULT_NODE_TITLE, FREE_MEMORY_LIMIT, Node};
    use chrono::Utc;
    use tempfile::TempDir;

    fn add_nodes(store: &dyn Store, user_id: &str, count: i64) {
        for i in 0..count {
            let now = Utc::now();
            store
                .create_node(&Node {
                    id: format!("{user_id}-n{i}"),
                    user_id: user_id.to_string(),
                    title: DEFAULT_NODE_TITLE.to_string(),
                    description: String::new(),
                    image_id: None,
                    tags: Vec::new(),
                    position_x: None,
                    position_y: None,
                    custom_date: None,
                    created_at: now,
                    updated_at: now,
                })
                .unwrap();
        }
    }

    #[test]
    fn test_free_user_under_limit() {
        let temp = TempDir::new().unwrap();
        let store = sqlite_store(&temp);
        let user_id = insert_user(store.as_ref(), "ada@example.com", false);
        add_nodes(store.as_ref(), &user_id, FREE_MEMORY_LIMIT - 1);

        let guard = QuotaGuard::new(store);
        assert!(guard.check_can_create_node(&user_id).is_ok());
    }

    #[test]
    fn test_free_user_at_limit() {
        let temp = TempDir::new().unwrap();
        let store = sqlite_store(&temp);
        let user_id = insert_user(store.as_ref(), "ada@example.com", false);
        add_nodes(store.as_ref(), &user_id, FREE_MEMORY_LIMIT);

        let guard = QuotaGuard::new(store);
        let err = guard.check_can_create_node(&user_id).unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { limit } if limit == FREE_MEMORY_LIMIT));
    }

    #[test]
    fn test_premium_user_never_blocked() {
        let temp = TempDir::new().unwrap();
        let store = sqlite_store(&temp);
        let user_id = insert_user(store.as_ref(), "ada@example.com", true);
        add_nodes(store.as_ref(), &user_id, FREE_MEMORY_LIMIT + 5);

        let guard = QuotaGuard::new(store);
        assert!(guard.check_can_create_node(&user_id).is_ok());
    }

    #[test]
    fn test_missing_user_passes() {
        let temp = TempDir::new().unwrap();
        let guard = QuotaGuard::new(sqlite_store(&temp));
        assert!(guard.check_can_create_node("ghost").is_ok());
    }
}
