//! Error types for augment-core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
 #[error("invalid config: {0}")]
 InvalidConfig(String),

 #[error("mailbox error: {0}")]
 Mailbox(String),

 #[error("no such slot: {0}")]
 NoSuchSlot(usize),

 #[error("plugin error: {0}")]
 Plugin(#[from] augment_plugin::PluginError),

 #[error("io error: {0}")]
 Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
