use std::sync::Arc;

use chrono::Utc;
use tokio::fs::File;
use uuid::Uuid;

use crate::blob::{ImageStorage, SignedMethod, SignedUrl, UrlSigner};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Image, ImagePublic};
use crate::validation::validate_file_name;

/// Uploaded pictures: signed upload and download URLs plus the image rows
/// that record them.
pub struct ImageService {
    store: Arc<dyn Store>,
    storage: Arc<ImageStorage>,
    signer: Arc<UrlSigner>,
}

impl ImageService {
    pub fn new(store: Arc<dyn Store>, storage: Arc<ImageStorage>, signer: Arc<UrlSigner>) -> Self {
        Self {
            store,
            storage,
            signer,
        }
    }

    pub fn get_upload_url(&self, owner: &str, file_name: &str) -> Result<SignedUrl> {
        validate_file_name(file_name)?;
        Ok(self.signer.sign(SignedMethod::Put, owner, file_name))
    }

    /// Records an uploaded object as an image. Confirming the same object
    /// twice returns the existing row.
    pub async fn confirm_upload(&self, owner: &str, file_name: &str) -> Result<ImagePublic> {
        validate_file_name(file_name)?;

        if !self.storage.exists(owner, file_name).await? {
            return Err(Error::NotFound);
        }

        let file_path = ImageStorage::object_key(owner, file_name);
        if let Some(existing) = self.store.get_image_by_path(owner, &file_path)? {
            return Ok(public_image(&self.signer, existing));
        }

        let image = Image {
            id: Uuid::new_v4().to_string(),
            user_id: owner.to_string(),
            file_path,
            is_inline: false,
            created_at: Utc::now(),
        };
        self.store.create_image(&image)?;

        tracing::info!(user_id = owner, image_id = %image.id, "Image upload confirmed");
        Ok(public_image(&self.signer, image))
    }

    pub fn get_url_by_name(&self, owner: &str, file_name: &str) -> Result<SignedUrl> {
        validate_file_name(file_name)?;

        let file_path = ImageStorage::object_key(owner, file_name);
        if self.store.get_image_by_path(owner, &file_path)?.is_none() {
            return Err(Error::NotFound);
        }
        Ok(self.signer.sign(SignedMethod::Get, owner, file_name))
    }

    pub fn get_image_info(&self, owner: &str, image_id: &str) -> Result<ImagePublic> {
        let image = self
            .store
            .get_image(owner, image_id)?
            .ok_or(Error::NotFound)?;
        Ok(public_image(&self.signer, image))
    }

    /// Deletes the object and its row. Refused while a node shows the image.
    pub async fn delete_image_file(&self, owner: &str, file_name: &str) -> Result<()> {
        validate_file_name(file_name)?;

        let file_path = ImageStorage::object_key(owner, file_name);
        let image = self
            .store
            .get_image_by_path(owner, &file_path)?
            .ok_or(Error::NotFound)?;

        if let Some(node_id) = self.store.find_node_by_image(owner, &image.id)? {
            return Err(Error::validation(format!(
                "Image is attached to node {node_id}"
            )));
        }

        remove_image(self.store.as_ref(), &self.storage, &image).await
    }

    /// Handles a PUT against a signed upload URL.
    pub async fn store_object(
        &self,
        user_id: &str,
        file_name: &str,
        expires: i64,
        signature: &str,
        data: &[u8],
    ) -> Result<()> {
        self.check_signature(SignedMethod::Put, user_id, file_name, expires, signature)?;
        self.storage.put(user_id, file_name, data).await?;
        tracing::debug!(user_id, file_name, size = data.len(), "Stored image object");
        Ok(())
    }

    /// Handles a GET against a signed download URL.
    pub async fn open_object(
        &self,
        user_id: &str,
        file_name: &str,
        expires: i64,
        signature: &str,
    ) -> Result<(File, u64)> {
        self.check_signature(SignedMethod::Get, user_id, file_name, expires, signature)?;
        Ok(self.storage.open(user_id, file_name).await?)
    }

    fn check_signature(
        &self,
        method: SignedMethod,
        user_id: &str,
        file_name: &str,
        expires: i64,
        signature: &str,
    ) -> Result<()> {
        if self
            .signer
            .verify(method, user_id, file_name, expires, signature, Utc::now())
        {
            Ok(())
        } else {
            Err(Error::InvalidToken)
        }
    }
}

/// What a node shows for its image: the inline data itself, or a signed
/// download URL for stored objects.
pub(crate) fn image_data(signer: &UrlSigner, image: &Image) -> Option<String> {
    if image.is_inline {
        return Some(image.file_path.clone());
    }
    let (user_id, file_name) = image.file_path.split_once('/')?;
    Some(signer.sign(SignedMethod::Get, user_id, file_name).signed_url)
}

pub(crate) fn public_image(signer: &UrlSigner, image: Image) -> ImagePublic {
    let (file_path, image_url) = if image.is_inline {
        (None, None)
    } else {
        let url = image_data(signer, &image);
        (Some(image.file_path), url)
    };

    ImagePublic {
        image_id: image.id,
        user_id: image.user_id,
        file_path,
        image_url,
        created_at: image.created_at,
    }
}

/// Removes the image row, then the stored object. A leftover object is
/// logged; the row is what makes an image visible.
pub(crate) async fn remove_image(
    store: &dyn Store,
    storage: &ImageStorage,
    image: &Image,
) -> Result<()> {
    store.delete_image(&image.user_id, &image.id)?;

    if !image.is_inline {
        if let Some((user_id, file_name)) = image.file_path.split_once('/') {
            if let Err(e) = storage.delete(user_id, file_name).await {
                tracing::warn!(
                    image_id = %image.id,
                    file_path = %image.file_path,
                    error = %e,
                    "Image row removed but object deletion failed"
                );
            }
        }
    }

    tracing::debug!(user_id = %image.user_id, image_id = %image.id, "Image removed");
    Ok(())
}
