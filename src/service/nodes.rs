use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::images::{image_data, remove_image};
use super::quota::QuotaGuard;
use crate::blob::{ImageStorage, UrlSigner};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::*;
use crate::validation::{page_bounds, validate_inline_image, validate_tags, validate_title};

#[derive(Debug, Clone, Default)]
pub struct NewNode {
    pub title: Option<String>,
    pub description: String,
    pub image: ImageRef,
    pub tags: Vec<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub custom_date: Option<DateTime<Utc>>,
}

/// Fields to change on a node. `None` and `ImageRef::Unchanged` leave the
/// stored value as it is.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: ImageRef,
    pub tags: Option<Vec<String>>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub custom_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodePage {
    pub nodes: Vec<NodePublic>,
    /// Every node the owner has, regardless of the page requested.
    pub total_count: i64,
}

/// Nodes and the node/image relationship.
///
/// A node points at no more than one image and an image belongs to no more
/// than one node. When a node gets a new image, the new one is saved before
/// the old one is removed.
pub struct NodeService {
    store: Arc<dyn Store>,
    quota: QuotaGuard,
    storage: Arc<ImageStorage>,
    signer: Arc<UrlSigner>,
    max_inline_image_bytes: usize,
}

impl NodeService {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<ImageStorage>,
        signer: Arc<UrlSigner>,
        max_inline_image_bytes: usize,
    ) -> Self {
        Self {
            quota: QuotaGuard::new(store.clone()),
            store,
            storage,
            signer,
            max_inline_image_bytes,
        }
    }

    pub async fn create_node(&self, owner: &str, new: NewNode) -> Result<NodePublic> {
        if let Some(title) = &new.title {
            validate_title(title)?;
        }
        validate_tags(&new.tags)?;
        self.validate_image_ref(&new.image)?;

        self.quota.check_can_create_node(owner)?;

        let image_id = match &new.image {
            ImageRef::Unchanged => None,
            ImageRef::Existing(image_id) => {
                self.claim_image(owner, image_id, None)?;
                Some(image_id.clone())
            }
            ImageRef::InlineData(data) => match self.save_inline_image(owner, data) {
                Ok(image_id) => Some(image_id),
                Err(e) => {
                    tracing::warn!(user_id = owner, error = %e, "Inline image not saved, creating node without it");
                    None
                }
            },
        };

        let now = Utc::now();
        let node = Node {
            id: Uuid::new_v4().to_string(),
            user_id: owner.to_string(),
            title: new
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NODE_TITLE.to_string()),
            description: new.description,
            image_id,
            tags: new.tags,
            position_x: new.position_x,
            position_y: new.position_y,
            custom_date: new.custom_date,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.create_node(&node) {
            tracing::error!(user_id = owner, error = %e, "Node insert failed");
            if matches!(new.image, ImageRef::InlineData(_)) {
                if let Some(image_id) = &node.image_id {
                    tracing::warn!(user_id = owner, image_id = %image_id, "Inline image left without a node");
                }
            }
            return Err(Error::CreationFailed);
        }

        tracing::info!(user_id = owner, node_id = %node.id, "Node created");

        let stored = self
            .store
            .get_node(owner, &node.id)?
            .ok_or(Error::CreationFailed)?;
        Ok(self.render(stored))
    }

    pub async fn update_node(
        &self,
        owner: &str,
        node_id: &str,
        update: NodeUpdate,
    ) -> Result<NodePublic> {
        if let Some(title) = &update.title {
            validate_title(title)?;
        }
        if let Some(tags) = &update.tags {
            validate_tags(tags)?;
        }
        self.validate_image_ref(&update.image)?;

        let existing = self
            .store
            .get_node(owner, node_id)?
            .ok_or(Error::NotFound)?;

        let new_image_id = match &update.image {
            ImageRef::Unchanged => None,
            ImageRef::Existing(image_id) if existing.image_id.as_ref() == Some(image_id) => None,
            ImageRef::Existing(image_id) => {
                self.claim_image(owner, image_id, Some(node_id))?;
                Some(image_id.clone())
            }
            ImageRef::InlineData(data) => Some(self.save_inline_image(owner, data)?),
        };

        let changes = NodeChanges {
            title: update.title.map(|title| {
                if title.trim().is_empty() {
                    DEFAULT_NODE_TITLE.to_string()
                } else {
                    title
                }
            }),
            description: update.description,
            image_id: new_image_id.clone(),
            tags: update.tags,
            position_x: update.position_x,
            position_y: update.position_y,
            custom_date: update.custom_date,
        };

        if changes.is_empty() {
            return Ok(self.render(existing));
        }

        let updated = self.store.update_node(owner, node_id, &changes);
        if !matches!(updated, Ok(true)) {
            if let (ImageRef::InlineData(_), Some(image_id)) = (&update.image, &new_image_id) {
                tracing::warn!(user_id = owner, node_id, image_id = %image_id, "Node update failed, new image left unattached");
            }
            return match updated {
                Err(e) => Err(e),
                _ => Err(Error::NotFound),
            };
        }

        if let (Some(new_id), Some(old_id)) = (&new_image_id, &existing.image_id) {
            if new_id != old_id {
                self.discard_image(owner, old_id).await;
            }
        }

        tracing::info!(user_id = owner, node_id, "Node updated");

        let stored = self
            .store
            .get_node(owner, node_id)?
            .ok_or(Error::NotFound)?;
        Ok(self.render(stored))
    }

    /// Deletes the node, then its image and links. Cleanup after the node row
    /// is gone never fails the call.
    pub async fn delete_node(&self, owner: &str, node_id: &str) -> Result<()> {
        let node = self
            .store
            .get_node(owner, node_id)?
            .ok_or(Error::NotFound)?;

        if !self.store.delete_node(owner, node_id)? {
            return Err(Error::NotFound);
        }
        tracing::info!(user_id = owner, node_id, "Node deleted");

        if let Some(image_id) = &node.image_id {
            self.discard_image(owner, image_id).await;
        }

        match self.store.delete_links_for_node(owner, node_id) {
            Ok(count) => tracing::debug!(user_id = owner, node_id, count, "Removed node links"),
            Err(e) => {
                tracing::warn!(user_id = owner, node_id, error = %e, "Link cleanup failed after node delete");
            }
        }

        Ok(())
    }

    pub fn list_nodes(&self, owner: &str, limit: Option<i64>, offset: Option<i64>) -> Result<NodePage> {
        let (limit, offset) = page_bounds(limit, offset);

        let nodes = self.store.list_nodes(owner, limit, offset)?;
        let total_count = self.store.count_nodes(owner)?;

        Ok(NodePage {
            nodes: nodes.into_iter().map(|node| self.render(node)).collect(),
            total_count,
        })
    }

    pub fn get_node_info(&self, owner: &str, node_id: &str) -> Result<NodePublic> {
        let node = self
            .store
            .get_node(owner, node_id)?
            .ok_or(Error::NotFound)?;
        Ok(self.render(node))
    }

    fn validate_image_ref(&self, image: &ImageRef) -> Result<()> {
        match image {
            ImageRef::InlineData(data) => validate_inline_image(data, self.max_inline_image_bytes),
            ImageRef::Existing(image_id) if image_id.trim().is_empty() => {
                Err(Error::validation("image_id cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// An existing image may be attached only by its owner and only when no
    /// other node shows it.
    fn claim_image(&self, owner: &str, image_id: &str, node_id: Option<&str>) -> Result<()> {
        if self.store.get_image(owner, image_id)?.is_none() {
            return Err(Error::validation(format!("Unknown image: {image_id}")));
        }
        match self.store.find_node_by_image(owner, image_id)? {
            Some(other) if Some(other.as_str()) != node_id => Err(Error::validation(format!(
                "Image {image_id} is already attached to another node"
            ))),
            _ => Ok(()),
        }
    }

    fn save_inline_image(&self, owner: &str, data: &str) -> Result<String> {
        let image = Image {
            id: Uuid::new_v4().to_string(),
            user_id: owner.to_string(),
            file_path: data.to_string(),
            is_inline: true,
            created_at: Utc::now(),
        };
        self.store.create_image(&image)?;
        tracing::debug!(user_id = owner, image_id = %image.id, "Saved inline image");
        Ok(image.id)
    }

    async fn discard_image(&self, owner: &str, image_id: &str) {
        let image = match self.store.get_image(owner, image_id) {
            Ok(Some(image)) => image,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(user_id = owner, image_id, error = %e, "Could not load image for cleanup");
                return;
            }
        };

        if let Err(e) = remove_image(self.store.as_ref(), &self.storage, &image).await {
            tracing::warn!(user_id = owner, image_id, error = %e, "Image cleanup failed, image is orphaned");
        }
    }

    /// Lookup failures only drop `image_data`; the node is still returned.
    fn render(&self, node: Node) -> NodePublic {
        let data = node.image_id.as_deref().and_then(|image_id| {
            match self.store.get_image(&node.user_id, image_id) {
                Ok(Some(image)) => image_data(&self.signer, &image),
                Ok(None) => None,
                Err(e) => {
                    tracing::debug!(node_id = %node.id, image_id, error = %e, "Image lookup failed");
                    None
                }
            }
        });
        NodePublic::new(node, data)
    }
}
