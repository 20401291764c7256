//! Error types for the set-page multiplexer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetPageError {
 #[error("io error: {0}")]
 Io(#[from] std::io::Error),

 #[error("a page change is already in flight")]
 ChangeInFlight,

 #[error("page index {0} out of range 0..7")]
 PageOutOfRange(u8),
}

pub type Result<T> = std::result::Result<T, SetPageError>;
