//! Centralized error type for the augment umbrella crate.
//!
//! Wraps every subsystem's error so `?` propagates naturally across crate
//! boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
 #[error(transparent)]
 Core(#[from] augment_core::Error),

 #[error("plugin: {0}")]
 Plugin(#[from] augment_plugin::PluginError),

 #[error("patch: {0}")]
 Patch(#[from] augment_patch::PatchError),

 #[error("sampler: {0}")]
 Sampler(#[from] augment_sampler::SamplerError),

 #[error("set page: {0}")]
 SetPage(#[from] augment_setpage::SetPageError),

 #[error(transparent)]
 Io(#[from] std::io::Error),

 #[error("no such slot: {0}")]
 NoSuchSlot(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
