//! # augment - Instrument-Augmentation Layer
//!
//! Coordinates per-slot plugin-hosted signal chains, a four-slot master-FX
//! bus, a quantized sampler, a skipback recorder, and an eight-page
//! project-library multiplexer that interposes between a hardware
//! controller's firmware and its audio path.
//!
//! ## Architecture
//!
//! `augment` is an umbrella crate that coordinates:
//! - **augment-core** - signal-chain scheduler, master FX, audio mailbox
//! - **augment-plugin** - sound-generator / audio-FX / MIDI-FX module loading
//! - **augment-param** - parameter bus, smoothing, knob macros
//! - **augment-patch** - patch and master-preset file formats and stores
//! - **augment-sampler** - quantized sampler and skipback recorder
//! - **augment-setpage** - eight-page project-library multiplexer
//!
//! ## Quick start
//!
//! ```ignore
//! use augment::AugmentEngine;
//!
//! let mut engine = AugmentEngine::builder()
//!.sample_rate(48000.0)
//!.frames_per_block(128)
//!.modules_dir("modules")
//!.build()?;
//!
//! engine.load_patch_into_slot(0, &patch.chain)?;
//! let out = engine.process_block(128, 48000.0, 0);
//! ```

pub use augment_core as core;
pub use augment_param as param;
pub use augment_patch as patch;
pub use augment_plugin as plugin;
pub use augment_sampler as sampler;
pub use augment_setpage as setpage;

mod builder;
mod engine;
mod error;
mod page;
mod params;
mod rpc;

pub use builder::AugmentEngineBuilder;
pub use engine::AugmentEngine;
pub use error::{Error, Result};

/// Convenience prelude for common imports.
pub mod prelude {
 pub use crate::{AugmentEngine, AugmentEngineBuilder};
 pub use crate::core::AugmentConfig;
 pub use crate::patch::{ChainBody, Patch, SaveNameHints};
}
