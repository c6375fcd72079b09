use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Node count allowed on the free plan.
pub const FREE_MEMORY_LIMIT: i64 = 30;

/// Stored as the limit of premium accounts; large enough to never be reached.
pub const PREMIUM_MEMORY_LIMIT: i64 = i32::MAX as i64;

pub const DEFAULT_NODE_TITLE: &str = "Untitled";

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub is_premium: bool,
    pub memory_limit: i64,
}

/// The only projection of a user that leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPublic {
    pub user_id: String,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub is_premium: bool,
    pub memory_limit: i64,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            first_name: user.first_name,
            surname: user.surname,
            email: user.email,
            created_at: user.created_at,
            is_premium: user.is_premium,
            memory_limit: user.memory_limit,
        }
    }
}

/// Profile fields a user may change one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserField {
    FirstName,
    Surname,
    Email,
    Password,
}

const USER_FIELD_COLUMNS: [(UserField, &str); 4] = [
    (UserField::FirstName, "first_name"),
    (UserField::Surname, "surname"),
    (UserField::Email, "email"),
    (UserField::Password, "password_hash"),
];

impl UserField {
    #[must_use]
    pub fn column(self) -> &'static str {
        USER_FIELD_COLUMNS
            .iter()
            .find(|(field, _)| *field == self)
            .map(|(_, column)| *column)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub image_id: Option<String>,
    pub tags: Vec<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub custom_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A node as returned to its owner, with the image resolved when available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePublic {
    pub node_id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub image_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    pub tags: Vec<String>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub custom_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NodePublic {
    #[must_use]
    pub fn new(node: Node, image_data: Option<String>) -> Self {
        Self {
            node_id: node.id,
            user_id: node.user_id,
            title: node.title,
            description: node.description,
            image_id: node.image_id,
            image_data,
            tags: node.tags,
            position_x: node.position_x,
            position_y: node.position_y,
            custom_date: node.custom_date,
            created_at: node.created_at,
            updated_at: node.updated_at,
        }
    }
}

/// Column-level changes for a node update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub custom_date: Option<DateTime<Utc>>,
}

impl NodeChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How a create or update request refers to the node's image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageRef {
    #[default]
    Unchanged,
    Existing(String),
    InlineData(String),
}

#[derive(Debug, Clone)]
pub struct Image {
    pub id: String,
    pub user_id: String,
    /// Object path in image storage, or the encoded picture for inline images.
    pub file_path: String,
    pub is_inline: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePublic {
    pub image_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLink {
    pub link_id: String,
    pub user_id: String,
    pub source_node_id: String,
    pub target_node_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: String,
    pub user_id: String,
    /// SHA-256 of the token handed to the user; the plaintext is never stored.
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl PasswordResetToken {
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_public_has_no_password_hash() {
        let user = User {
            id: "u-1".to_string(),
            first_name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
            is_premium: false,
            memory_limit: FREE_MEMORY_LIMIT,
        };

        let json = serde_json::to_value(UserPublic::from(user)).unwrap();
        assert_eq!(json["email"], "ada@example.com");
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2id"));
    }

    #[test]
    fn test_user_field_columns() {
        assert_eq!(UserField::FirstName.column(), "first_name");
        assert_eq!(UserField::Surname.column(), "surname");
        assert_eq!(UserField::Email.column(), "email");
        assert_eq!(UserField::Password.column(), "password_hash");
    }

    #[test]
    fn test_reset_token_validity() {
        let now = Utc::now();
        let mut token = PasswordResetToken {
            id: "t-1".to_string(),
            user_id: "u-1".to_string(),
            token_hash: "abc".to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
            used: false,
        };
        assert!(token.is_valid_at(now));
        assert!(!token.is_valid_at(now + chrono::Duration::hours(2)));

        token.used = true;
        assert!(!token.is_valid_at(now));
    }

    #[test]
    fn test_empty_node_changes() {
        assert!(NodeChanges::default().is_empty());
        let changes = NodeChanges {
            description: Some("new".to_string()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
