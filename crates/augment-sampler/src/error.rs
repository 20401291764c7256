//! Error types for the sampler and skipback recorder.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamplerError {
 #[error("io error: {0}")]
 Io(#[from] std::io::Error),

 #[error("wav error: {0}")]
 Wav(#[from] hound::Error),

 #[error("sampler is not idle, cannot arm")]
 NotIdle,

 #[error("sampler is not armed, cannot start recording")]
 NotArmed,

 #[error("sampler is idle, nothing to stop")]
 AlreadyIdle,

 #[error("a skipback save is already in progress")]
 SkipbackBusy,
}

pub type Result<T> = std::result::Result<T, SamplerError>;
