//! Error types for parameter routing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParamError {
 #[error("no such slot: {0}")]
 NoSuchSlot(i32),

 #[error("no live plugin for target")]
 NoLivePlugin,

 #[error("unknown key: {0}")]
 UnknownKey(String),
}

pub type Result<T> = std::result::Result<T, ParamError>;
