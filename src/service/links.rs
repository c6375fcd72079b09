use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::NodeLink;

pub struct LinkService {
    store: Arc<dyn Store>,
}

impl LinkService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Both ends must be nodes owned by `owner`.
    pub fn create_link(
        &self,
        owner: &str,
        source_node_id: &str,
        target_node_id: &str,
    ) -> Result<NodeLink> {
        if source_node_id == target_node_id {
            return Err(Error::validation("A node cannot link to itself"));
        }
        for node_id in [source_node_id, target_node_id] {
            if self.store.get_node(owner, node_id)?.is_none() {
                return Err(Error::validation(format!("Unknown node: {node_id}")));
            }
        }

        let link = NodeLink {
            link_id: Uuid::new_v4().to_string(),
            user_id: owner.to_string(),
            source_node_id: source_node_id.to_string(),
            target_node_id: target_node_id.to_string(),
            created_at: Utc::now(),
        };
        self.store.create_link(&link)?;

        tracing::info!(user_id = owner, link_id = %link.link_id, "Link created");
        Ok(link)
    }

    pub fn list_links(&self, owner: &str) -> Result<Vec<NodeLink>> {
        self.store.list_links(owner)
    }

    pub fn delete_link(&self, owner: &str, link_id: &str) -> Result<()> {
        if !self.store.delete_link(owner, link_id)? {
            return Err(Error::NotFound);
        }
        tracing::info!(user_id = owner, link_id, "Link deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{insert_user, sqlite_store};
    use crate::types::{DEFAULT_NODE_TITLE, Node};
    use tempfile::TempDir;

    fn add_node(store: &dyn Store, user_id: &str, node_id: &str) {
        let now = Utc::now();
        store
            .create_node(&Node {
                id: node_id.to_string(),
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

    #[test]
    fn test_link_lifecycle() {
        let temp = TempDir::new().unwrap();
        let store = sqlite_store(&temp);
        let user_id = insert_user(store.as_ref(), "ada@example.com", false);
        add_node(store.as_ref(), &user_id, "a");
        add_node(store.as_ref(), &user_id, "b");

        let service = LinkService::new(store);
        let link = service.create_link(&user_id, "a", "b").unwrap();
        assert_eq!(service.list_links(&user_id).unwrap().len(), 1);

        service.delete_link(&user_id, &link.link_id).unwrap();
        assert!(service.list_links(&user_id).unwrap().is_empty());
        assert!(matches!(
            service.delete_link(&user_id, &link.link_id),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_link_requires_owned_nodes() {
        let temp = TempDir::new().unwrap();
        let store = sqlite_store(&temp);
        let ada = insert_user(store.as_ref(), "ada@example.com", false);
        let bob = insert_user(store.as_ref(), "bob@example.com", false);
        add_node(store.as_ref(), &ada, "a");
        add_node(store.as_ref(), &bob, "b");

        let service = LinkService::new(store);
        assert!(matches!(
            service.create_link(&ada, "a", "b"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.create_link(&ada, "a", "a"),
            Err(Error::Validation(_))
        ));
    }
}
