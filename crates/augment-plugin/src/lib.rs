//! Plugin ABI loader for the augment instrument-augmentation layer.
//!
//! Three ABIs — sound generator, audio FX, MIDI FX — share a load protocol:
//! resolve the shared object, resolve a versioned init symbol, reject
//! mismatched ABI versions, create/destroy opaque instances. See.

pub mod abi;
pub mod descriptor;
pub mod error;
pub mod loader;

pub use abi::{ClockStatus, HostCapabilities, MAX_MIDI_FANOUT};
pub use descriptor::{Capabilities, ModuleDescriptor, ParamType, ParameterDescriptor};
pub use error::{LoadStage, PluginError, Result};
pub use loader::{default_host_capabilities, validate_module_name, LoadedAudioFx, LoadedGenerator, LoadedMidiFx};
