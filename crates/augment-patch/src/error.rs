//! Error types for the patch and master-preset stores.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
 #[error("io error: {0}")]
 Io(#[from] std::io::Error),

 #[error("malformed patch json: {0}")]
 Json(#[from] serde_json::Error),

 #[error("no patch at index {0}")]
 NoSuchPatch(usize),

 #[error("invalid patch: {0}")]
 InvalidPatch(String),

 #[error("patch store is full ({0} patches tracked)")]
 StoreFull(usize),

 #[error("could not find a free filename for {0:?}")]
 NoFreeFilename(String),
}

pub type Result<T> = std::result::Result<T, PatchError>;
