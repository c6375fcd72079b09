//! Business services
//!
//! Each service owns an `Arc<dyn Store>` handed in at construction and keeps
//! no other mutable state:
//!
//! - `AccountService` - signup, login, profile edits and password reset
//! - `QuotaGuard` - free-plan node limit
//! - `NodeService` - nodes and the node/image relationship
//! - `ImageService` - uploaded pictures and their signed URLs
//! - `LinkService` - edges between a user's nodes
//!
//! Multi-step operations are not transactional. Each step logs its outcome and
//! cleanup failures after the primary change are logged rather than returned.

mod accounts;
mod images;
mod links;
mod nodes;
mod quota;

#[cfg(test)]
pub(crate) mod testing;

pub use accounts::{AccountService, FORGOT_PASSWORD_MESSAGE};
pub use images::ImageService;
pub use links::LinkService;
pub use nodes::{NewNode, NodePage, NodeService, NodeUpdate};
pub use quota::QuotaGuard;
