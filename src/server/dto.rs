use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::service::{NewNode, NodeUpdate};
use crate::types::{ImageRef, UserField};
use crate::validation::parse_custom_date;

// Users

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
}

/// OAuth2 password-flow form; `username` carries the email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetUserInfoParams {
    pub new_val: String,
    pub reset_mode: UserField,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

// Nodes

/// Explicit image reference carried by node requests. Leaving the field out
/// keeps the current image.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImagePayload {
    Inline { data: String },
    Existing { image_id: String },
}

impl From<Option<ImagePayload>> for ImageRef {
    fn from(payload: Option<ImagePayload>) -> Self {
        match payload {
            None => ImageRef::Unchanged,
            Some(ImagePayload::Inline { data }) => ImageRef::InlineData(data),
            Some(ImagePayload::Existing { image_id }) => ImageRef::Existing(image_id),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNodeRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<ImagePayload>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub position_x: Option<f64>,
    #[serde(default)]
    pub position_y: Option<f64>,
    #[serde(default)]
    pub custom_date: Option<String>,
}

impl CreateNodeRequest {
    pub fn into_new_node(self) -> Result<NewNode> {
        Ok(NewNode {
            title: self.title,
            description: self.description,
            image: self.image.into(),
            tags: self.tags,
            position_x: self.position_x,
            position_y: self.position_y,
            custom_date: self.custom_date.as_deref().map(parse_custom_date).transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateNodeRequest {
    pub node_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<ImagePayload>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub position_x: Option<f64>,
    #[serde(default)]
    pub position_y: Option<f64>,
    #[serde(default)]
    pub custom_date: Option<String>,
}

impl UpdateNodeRequest {
    pub fn into_update(self) -> Result<(String, NodeUpdate)> {
        let update = NodeUpdate {
            title: self.title,
            description: self.description,
            image: self.image.into(),
            tags: self.tags,
            position_x: self.position_x,
            position_y: self.position_y,
            custom_date: self.custom_date.as_deref().map(parse_custom_date).transpose()?,
        };
        Ok((self.node_id, update))
    }
}

#[derive(Debug, Deserialize)]
pub struct NodeIdParams {
    pub node_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListNodesParams {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

// Images

#[derive(Debug, Deserialize)]
pub struct FileNameParams {
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageIdParams {
    pub image_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StoragePath {
    pub user_id: String,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SignatureParams {
    pub expires: i64,
    pub signature: String,
}

// Links

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub source_node_id: String,
    pub target_node_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkIdParams {
    pub link_id: String,
}
