mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Every method is a single statement against the backing database. Callers
/// that need several steps sequence them themselves and must tolerate partial
/// failure between steps.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    /// Fails with `Error::DuplicateEmail` when the email is taken.
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn update_user_field(&self, id: &str, field: UserField, value: &str) -> Result<()>;
    fn set_user_plan(&self, id: &str, is_premium: bool, memory_limit: i64) -> Result<()>;

    // Node operations
    fn create_node(&self, node: &Node) -> Result<()>;
    fn get_node(&self, user_id: &str, node_id: &str) -> Result<Option<Node>>;
    fn list_nodes(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<Node>>;
    fn count_nodes(&self, user_id: &str) -> Result<i64>;
    /// Returns false when no node matches `(user_id, node_id)`.
    fn update_node(&self, user_id: &str, node_id: &str, changes: &NodeChanges) -> Result<bool>;
    fn delete_node(&self, user_id: &str, node_id: &str) -> Result<bool>;
    fn find_node_by_image(&self, user_id: &str, image_id: &str) -> Result<Option<String>>;

    // Image operations
    fn create_image(&self, image: &Image) -> Result<()>;
    fn get_image(&self, user_id: &str, image_id: &str) -> Result<Option<Image>>;
    fn get_image_by_path(&self, user_id: &str, file_path: &str) -> Result<Option<Image>>;
    fn delete_image(&self, user_id: &str, image_id: &str) -> Result<bool>;

    // Link operations
    fn create_link(&self, link: &NodeLink) -> Result<()>;
    fn list_links(&self, user_id: &str) -> Result<Vec<NodeLink>>;
    fn delete_link(&self, user_id: &str, link_id: &str) -> Result<bool>;
    /// Removes every link with the node as source or target; returns the count.
    fn delete_links_for_node(&self, user_id: &str, node_id: &str) -> Result<usize>;

    // Password reset token operations
    fn create_reset_token(&self, token: &PasswordResetToken) -> Result<()>;
    fn get_reset_token(&self, token_hash: &str) -> Result<Option<PasswordResetToken>>;
    /// Flips `used` only when it was still false; returns whether it flipped.
    fn mark_reset_token_used(&self, token_hash: &str) -> Result<bool>;
}
