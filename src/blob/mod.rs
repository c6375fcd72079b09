mod signing;
mod storage;

pub use signing::{SignedMethod, SignedUrl, UrlSigner};
pub use storage::{ImageStorage, ImageStorageError};
