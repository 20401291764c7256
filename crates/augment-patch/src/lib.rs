//! Patch and master-preset file formats and stores.

pub mod error;
pub mod master_preset;
pub mod schema;
pub mod store;

pub use error::{PatchError, Result};
pub use master_preset::{MasterFxSlotEntry, MasterFxSlots, MasterPreset, MasterPresetStore};
pub use schema::{AudioFxSlot, ChainBody, KnobMappingEntry, MidiFxSlot, Patch, SynthSlot};
pub use store::{PatchEntry, PatchStore, SaveNameHints, MAX_TRACKED_PATCHES};
