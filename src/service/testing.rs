use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{Duration, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use crate::blob::{ImageStorage, UrlSigner};
use crate::error::{Error, Result};
use crate::store::{SqliteStore, Store};
use crate::types::*;

pub fn sqlite_store(temp: &TempDir) -> Arc<SqliteStore> {
    let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
    store.initialize().unwrap();
    Arc::new(store)
}

pub fn image_storage(temp: &TempDir) -> Arc<ImageStorage> {
    Arc::new(ImageStorage::new(temp.path(), std::time::Duration::from_secs(5)))
}

pub fn url_signer() -> Arc<UrlSigner> {
    Arc::new(UrlSigner::new(
        b"test-key",
        "http://localhost:8080",
        Duration::minutes(15),
    ))
}

pub fn insert_user(store: &dyn Store, email: &str, is_premium: bool) -> String {
    let id = Uuid::new_v4().to_string();
    store
        .create_user(&User {
            id: id.clone(),
            first_name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            email: email.to_string(),
            password_hash: "unused".to_string(),
            created_at: Utc::now(),
            is_premium,
            memory_limit: if is_premium {
                PREMIUM_MEMORY_LIMIT
            } else {
                FREE_MEMORY_LIMIT
            },
        })
        .unwrap();
    id
}

/// Wraps a real store and fails selected image and cleanup calls on demand.
pub struct FaultyStore {
    inner: Arc<SqliteStore>,
    pub fail_image_create: AtomicBool,
    pub fail_image_get: AtomicBool,
    pub fail_image_delete: AtomicBool,
    pub fail_link_cleanup: AtomicBool,
}

impl FaultyStore {
    pub fn new(inner: Arc<SqliteStore>) -> Self {
        Self {
            inner,
            fail_image_create: AtomicBool::new(false),
            fail_image_get: AtomicBool::new(false),
            fail_image_delete: AtomicBool::new(false),
            fail_link_cleanup: AtomicBool::new(false),
        }
    }

    fn injected() -> Error {
        Error::upstream("injected failure")
    }
}

impl Store for FaultyStore {
    fn initialize(&self) -> Result<()> {
        self.inner.initialize()
    }

    fn create_user(&self, user: &User) -> Result<()> {
        self.inner.create_user(user)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.inner.get_user(id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner.get_user_by_email(email)
    }

    fn update_user_field(&self, id: &str, field: UserField, value: &str) -> Result<()> {
        self.inner.update_user_field(id, field, value)
    }

    fn set_user_plan(&self, id: &str, is_premium: bool, memory_limit: i64) -> Result<()> {
        self.inner.set_user_plan(id, is_premium, memory_limit)
    }

    fn create_node(&self, node: &Node) -> Result<()> {
        self.inner.create_node(node)
    }

    fn get_node(&self, user_id: &str, node_id: &str) -> Result<Option<Node>> {
        self.inner.get_node(user_id, node_id)
    }

    fn list_nodes(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<Node>> {
        self.inner.list_nodes(user_id, limit, offset)
    }

    fn count_nodes(&self, user_id: &str) -> Result<i64> {
        self.inner.count_nodes(user_id)
    }

    fn update_node(&self, user_id: &str, node_id: &str, changes: &NodeChanges) -> Result<bool> {
        self.inner.update_node(user_id, node_id, changes)
    }

    fn delete_node(&self, user_id: &str, node_id: &str) -> Result<bool> {
        self.inner.delete_node(user_id, node_id)
    }

    fn find_node_by_image(&self, user_id: &str, image_id: &str) -> Result<Option<String>> {
        self.inner.find_node_by_image(user_id, image_id)
    }

    fn create_image(&self, image: &Image) -> Result<()> {
        if self.fail_image_create.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.create_image(image)
    }

    fn get_image(&self, user_id: &str, image_id: &str) -> Result<Option<Image>> {
        if self.fail_image_get.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.get_image(user_id, image_id)
    }

    fn get_image_by_path(&self, user_id: &str, file_path: &str) -> Result<Option<Image>> {
        self.inner.get_image_by_path(user_id, file_path)
    }

    fn delete_image(&self, user_id: &str, image_id: &str) -> Result<bool> {
        if self.fail_image_delete.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.delete_image(user_id, image_id)
    }

    fn create_link(&self, link: &NodeLink) -> Result<()> {
        self.inner.create_link(link)
    }

    fn list_links(&self, user_id: &str) -> Result<Vec<NodeLink>> {
        self.inner.list_links(user_id)
    }

    fn delete_link(&self, user_id: &str, link_id: &str) -> Result<bool> {
        self.inner.delete_link(user_id, link_id)
    }

    fn delete_links_for_node(&self, user_id: &str, node_id: &str) -> Result<usize> {
        if self.fail_link_cleanup.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.delete_links_for_node(user_id, node_id)
    }

    fn create_reset_token(&self, token: &PasswordResetToken) -> Result<()> {
        self.inner.create_reset_token(token)
    }

    fn get_reset_token(&self, token_hash: &str) -> Result<Option<PasswordResetToken>> {
        self.inner.get_reset_token(token_hash)
    }

    fn mark_reset_token_used(&self, token_hash: &str) -> Result<bool> {
        self.inner.mark_reset_token_used(token_hash)
    }
}

/// Captures reset links instead of sending them.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
    pub delay_ms: AtomicU64,
}

#[async_trait::async_trait]
impl crate::mail::Mailer for RecordingMailer {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<()> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Upstream {
                message: "mail provider down".to_string(),
                retryable: true,
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), reset_link.to_string()));
        Ok(())
    }
}
